//! One catalog, many simultaneous resolutions.

use baseline_core::{CatalogSource, ProfileArena, Resolver};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

#[test]
fn test_shared_catalog_across_threads() {
    let catalog = Arc::new(
        baseline_core::catalog::load(&[CatalogSource::from_path(fixtures().join("catalog"))])
            .unwrap(),
    );
    let profiles = Arc::new(ProfileArena::load_dir(&fixtures().join("profiles")).unwrap());
    let resolver = Resolver::new(Arc::clone(&catalog), profiles);

    let expected: Vec<(String, String)> = ["ospp", "stig", "cis"]
        .iter()
        .map(|id| {
            let plan = resolver.resolve(id).unwrap();
            (id.to_string(), plan.to_json_pretty().unwrap())
        })
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let resolver = resolver.clone();
            let expected = expected.clone();
            thread::spawn(move || {
                for round in 0..10 {
                    let (id, json) = &expected[(i + round) % expected.len()];
                    let plan = resolver.resolve(id).unwrap();
                    assert_eq!(&plan.to_json_pretty().unwrap(), json);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    // Workers held clones only; the catalog itself was never copied.
    drop(resolver);
    assert_eq!(Arc::strong_count(&catalog), 1);
}

#[test]
fn test_two_catalogs_coexist() {
    let small = Arc::new(
        baseline_core::catalog::load(&[CatalogSource::Inline {
            name: "small".into(),
            content: "rules:\n  - id: package_tmux_installed\n".into(),
        }])
        .unwrap(),
    );
    let full = Arc::new(
        baseline_core::catalog::load(&[CatalogSource::from_path(fixtures().join("catalog"))])
            .unwrap(),
    );
    let profiles = Arc::new(ProfileArena::load_dir(&fixtures().join("profiles")).unwrap());

    let against_small = Resolver::new(small, Arc::clone(&profiles))
        .resolve("ospp")
        .unwrap();
    let against_full = Resolver::new(full, profiles).resolve("ospp").unwrap();

    assert!(!against_small.is_build_ready());
    assert!(against_full.is_build_ready());
    assert_ne!(against_small.catalog_digest, against_full.catalog_digest);
}
