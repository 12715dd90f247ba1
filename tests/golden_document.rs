use std::fs;
use std::path::PathBuf;

use rfpreview::{project, render};

fn golden_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/expected");
    p.push(name);
    p
}

// Any change to the composed template (reset, isolator, shim) shows up here;
// regenerate deliberately with UPDATE_GOLDENS=1.
#[test]
fn golden_starter_document_digest() {
    let bundle = project::load_dir(&PathBuf::from("tests/goldens/pages/starter")).expect("read fixture");
    let doc = render(&bundle);

    let expected_path = golden_path("starter.sha256");
    if std::env::var("UPDATE_GOLDENS").is_ok() {
        fs::create_dir_all("tests/goldens/expected").ok();
        fs::write(&expected_path, doc.digest()).expect("write golden");
        println!("Updated golden: {:?}", expected_path);
        return;
    }

    if !expected_path.exists() {
        println!(
            "No golden at {:?}; run with UPDATE_GOLDENS=1 to create it. Skipping.",
            expected_path
        );
        return;
    }

    let exp = fs::read_to_string(&expected_path).expect("unable to read golden");
    assert_eq!(doc.digest(), exp.trim());
}
