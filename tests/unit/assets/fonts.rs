use super::*;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("framegif-fonts-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn default_request_is_arial() {
    assert_eq!(FontRequest::default(), FontRequest::Named("arial".to_owned()));
}

#[test]
fn request_deserializes_from_tagged_json() {
    let r: FontRequest = serde_json::from_str(r#"{"named": "DejaVuSans"}"#).unwrap();
    assert_eq!(r, FontRequest::Named("DejaVuSans".to_owned()));
    let r: FontRequest = serde_json::from_str(r#"{"path": "fonts/a.ttf"}"#).unwrap();
    assert_eq!(r, FontRequest::Path(PathBuf::from("fonts/a.ttf")));
}

#[test]
fn named_lookup_is_case_insensitive_and_recursive() {
    let dir = scratch_dir("named");
    std::fs::create_dir_all(dir.join("truetype/acme")).unwrap();
    std::fs::write(dir.join("truetype/acme/Arial.TTF"), b"fake-font").unwrap();
    std::fs::write(dir.join("arial.txt"), b"nope").unwrap();

    let resolver = FontResolver::with_dirs_only([dir.clone()]);
    let found = resolver.find_named("ARIAL").unwrap();
    assert!(found.ends_with("truetype/acme/Arial.TTF"));

    let loaded = resolver.load(&FontRequest::Named("arial".to_owned())).unwrap();
    assert_eq!(loaded.bytes.as_slice(), b"fake-font");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_named_font_reports_request() {
    let dir = scratch_dir("missing");
    let resolver = FontResolver::with_dirs_only([dir.clone()]);
    let err = resolver
        .load(&FontRequest::Named("nope-sans".to_owned()))
        .unwrap_err();
    assert_eq!(err.requested, "nope-sans");
    assert!(err.reason.contains("no .ttf/.otf/.ttc"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_path_and_empty_bytes_fail() {
    let resolver = FontResolver::with_dirs_only(Vec::new());
    assert!(
        resolver
            .load(&FontRequest::Path(PathBuf::from("/definitely/not/here.ttf")))
            .is_err()
    );
    assert!(
        resolver
            .load(&FontRequest::Bytes(Arc::new(Vec::new())))
            .is_err()
    );
}

#[test]
fn extra_dirs_come_first() {
    let resolver = FontResolver::new([PathBuf::from("/opt/brand-fonts")]);
    assert_eq!(resolver.search_dirs()[0], PathBuf::from("/opt/brand-fonts"));
    assert!(resolver.search_dirs().len() > 1);
}
