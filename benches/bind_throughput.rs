use brrtbind::request::route_params;
use brrtbind::{BindRequest, Binder, Controller, RouteParams, Slot, UploadedFile};
use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use serde_json::json;
use std::hint::black_box;

#[derive(Debug, Default, Controller)]
#[bind(rename_all = "camelCase")]
struct ListPosts {
    user_id: Slot<i64>,
    page: Option<u32>,
    #[bind(default)]
    per_page: Option<u32>,
    tags: Vec<String>,
    include_drafts: bool,
}

#[derive(Debug, Default, Controller)]
struct UploadDocs {
    title: Slot<String>,
    docs: Vec<UploadedFile>,
}

fn bench_bind_throughput(c: &mut Criterion) {
    let binder = Binder::default();

    let list_req = BindRequest::new(
        Method::GET,
        "/users/7/posts?page=2&tags[]=rust&tags[]=http&include_drafts=1",
    );
    let list_route = route_params([("user_id", "7")]);
    c.bench_function("bind_query_and_route", |b| {
        b.iter(|| {
            let bound: ListPosts = binder.bind_new(&list_req, &list_route).unwrap_or_default();
            black_box(bound);
        })
    });

    let upload_req = BindRequest::new(Method::POST, "/docs")
        .with_body(json!({"title": "Quarterly"}))
        .with_file(
            "docs",
            json!([
                {"tmp_name": "/tmp/a", "name": "a.pdf", "size": 100, "error": 0},
                {"tmp_name": "/tmp/b", "name": "b.pdf", "size": 200, "error": 0}
            ]),
        );
    let empty = RouteParams::new();
    c.bench_function("bind_body_and_files", |b| {
        b.iter(|| {
            let bound: UploadDocs = binder.bind_new(&upload_req, &empty).unwrap_or_default();
            black_box(bound);
        })
    });
}

criterion_group!(benches, bench_bind_throughput);
criterion_main!(benches);
