#![allow(dead_code)]

pub mod fixtures {
    use brrtbind::BindRequest;
    use http::Method;
    use serde_json::{json, Value};

    /// Raw upload descriptor as the multipart layer produces it.
    pub fn upload(tmp: &str, name: &str, size: u64) -> Value {
        json!({
            "tmp_name": tmp,
            "name": name,
            "size": size,
            "type": "application/octet-stream",
            "error": 0
        })
    }

    pub fn get(path: &str) -> BindRequest {
        BindRequest::new(Method::GET, path)
    }

    pub fn post(path: &str, body: Value) -> BindRequest {
        BindRequest::new(Method::POST, path).with_body(body)
    }
}

pub mod logging {
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Route binder events to the test writer (`RUST_LOG=brrtbind=trace`).
    pub fn init() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        });
    }
}
