use brrtbind::{Binder, BinderConfig};
use std::io::Write;

#[test]
fn test_load_from_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "http:\n  keep_alive: true\nbinder:\n  file_temp_key: tmp_path\n  descriptor_cache: false\n"
    )
    .unwrap();

    let config = BinderConfig::load(file.path()).unwrap();
    assert_eq!(config.file_temp_key, "tmp_path");
    assert!(!config.descriptor_cache);
    assert!(config.naming_fallback);

    let binder = Binder::new(config.clone());
    assert_eq!(binder.config(), &config);
}

#[test]
fn test_load_missing_file_reports_path() {
    let err = BinderConfig::load("/definitely/not/here/config.yaml").unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here/config.yaml"));
}

#[test]
fn test_load_empty_file_gives_defaults() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let config = BinderConfig::from_yaml_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
    assert_eq!(config, BinderConfig::default());
}
