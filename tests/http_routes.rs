mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::Router;
use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION};
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use manga_catalog::config::{
    AnnouncementSettings, AvatarSettings, BannerSettings, CdnSettings, ShowcaseSettings,
};
use manga_catalog::infra::http::{build_admin_router, build_router};
use serde_json::{Value, json};
use tower::ServiceExt;

use support::{CDN_BASE, FakeCatalog, Harness, chapter, manga};

fn harness() -> Harness {
    let mut curated = manga(2, "Monster");
    curated.is_choiceness = true;
    curated.country = Some("jp".into());
    let repo = FakeCatalog::with_manga(vec![manga(1, "Akira"), curated]);
    repo.add_chapter(chapter(5, 1, 1));
    Harness::new(repo)
}

async fn call(
    router: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = send(router, method, uri, body).await;
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn send(
    router: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    router
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("router is infallible")
}

#[tokio::test]
async fn listing_is_wrapped_in_success_envelope() {
    let harness = harness();
    let (status, body) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/manga?page=0&size=10",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["totalElements"], json!(2));
    assert_eq!(body["data"]["size"], json!(10));
    assert_eq!(
        body["data"]["items"][0]["coverImageUrl"],
        json!(format!("{CDN_BASE}/covers/2.jpg"))
    );
}

#[tokio::test]
async fn facet_routes_filter_the_catalog() {
    let harness = harness();

    let (_, curated) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/manga/choiceness",
        None,
    )
    .await;
    assert_eq!(curated["data"]["totalElements"], json!(1));
    assert_eq!(curated["data"]["items"][0]["title"], json!("Monster"));

    let (_, by_country) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/manga/country/jp",
        None,
    )
    .await;
    assert_eq!(by_country["data"]["items"][0]["id"], json!(2));
}

#[tokio::test]
async fn oversized_page_is_a_validation_error() {
    let harness = harness();
    let (status, body) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/manga/latest?size=1000",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("validation_error"));
    assert_eq!(FakeCatalog::calls(&harness.repo.list_calls), 0);
}

#[tokio::test]
async fn malformed_query_and_path_are_bad_requests() {
    let harness = harness();

    let (status, body) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/manga?page=minus-one",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("bad_request"));

    let (status, _) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/chapters/not-a-number",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn detail_records_a_view_and_unknown_id_is_404() {
    let harness = harness();

    let (status, body) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/manga/1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], json!("Akira"));
    assert_eq!(harness.repo.views(1), 1);

    let (status, body) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/manga/404",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("not_found"));
}

#[tokio::test]
async fn search_requires_a_keyword() {
    let harness = harness();

    let (status, _) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/manga/search?keyword=%20%20",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/manga/search?keyword=aki&tag=all&sort=updated",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalElements"], json!(1));
}

#[tokio::test]
async fn chapter_routes_translate_page_urls() {
    let harness = harness();

    let (status, body) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/chapters/manga/1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"][0]["pageUrls"][0],
        json!(format!("{CDN_BASE}/pages/1/1/1.jpg"))
    );

    let (status, body) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/chapters/manga/1/chapter/1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!(5));
}

#[tokio::test]
async fn chapter_reads_record_views_on_both_routes() {
    let harness = harness();
    let before = harness.repo.chapter_views(5);

    for uri in ["/api/chapters/5", "/api/chapters/manga/1/chapter/1"] {
        let (status, _) = call(build_router(harness.http_state()), Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }
    assert_eq!(harness.repo.chapter_views(5), before + 2);

    let (status, _) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/chapters/manga/1/chapter/9",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(harness.repo.chapter_views(5), before + 2);
}

#[tokio::test]
async fn store_outage_hides_detail_from_clients() {
    let harness = harness();
    harness.repo.fail_reads.store(true, Ordering::SeqCst);

    let (status, body) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/manga/popular",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], json!("db_timeout"));
}

#[tokio::test]
async fn asset_redirect_points_at_cdn_with_cache_headers() {
    let harness = harness();

    let response = send(
        build_router(harness.http_state()),
        Method::GET,
        "/assets/covers/1.jpg",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[LOCATION],
        format!("{CDN_BASE}/covers/1.jpg").as_str()
    );
    assert_eq!(response.headers()[CACHE_CONTROL], "public, max-age=2592000");

    let response = send(
        build_router(harness.http_state()),
        Method::GET,
        "/assets/covers/1.jpg?fallback=true",
        None,
    )
    .await;
    assert_eq!(
        response.headers()[LOCATION],
        "https://origin.example.com/covers/1.jpg"
    );
}

fn pass_through_harness() -> Harness {
    let config = manga_catalog::cache::CacheConfig::default();
    let store: Arc<dyn manga_catalog::cache::CacheStore> =
        Arc::new(manga_catalog::cache::MemoryCacheStore::new(&config));
    Harness::build(
        FakeCatalog::with_manga(Vec::new()),
        config,
        store,
        CdnSettings {
            enabled: false,
            ..support::cdn_settings()
        },
        ShowcaseSettings::default(),
    )
}

async fn redirect_target(harness: &Harness, uri: &str) -> String {
    let response = send(build_router(harness.http_state()), Method::GET, uri, None).await;
    assert_eq!(response.status(), StatusCode::FOUND, "{uri}");
    response.headers()[LOCATION]
        .to_str()
        .expect("ascii location")
        .to_string()
}

#[tokio::test]
async fn asset_redirect_stays_on_origin_without_cdn() {
    let harness = pass_through_harness();

    for uri in [
        "/assets///evil.example/x.jpg",
        "/assets/%2F%2Fevil.example/x.jpg",
        "/assets/%5C%5Cevil.example/x.jpg",
    ] {
        let location = redirect_target(&harness, uri).await;
        assert_eq!(location, "/evil.example/x.jpg", "{uri}");
    }
    assert_eq!(
        redirect_target(&harness, "/assets/covers/1.jpg").await,
        "/covers/1.jpg"
    );
}

#[tokio::test]
async fn asset_redirect_percent_encodes_the_location() {
    let harness = harness();

    assert_eq!(
        redirect_target(&harness, "/assets/%E6%BC%AB/a.jpg").await,
        format!("{CDN_BASE}/%E6%BC%AB/a.jpg")
    );
    assert_eq!(
        redirect_target(&harness, "/assets/%2F%2Fevil.example/x.jpg").await,
        format!("{CDN_BASE}/evil.example/x.jpg")
    );
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let harness = harness();
    let response = send(
        build_router(harness.http_state()),
        Method::GET,
        "/api/manga/tags",
        None,
    )
    .await;
    assert!(response.headers().contains_key("x-request-id"));

    let response = build_router(harness.http_state())
        .oneshot(
            Request::builder()
                .uri("/api/manga/tags")
                .header("x-request-id", "edge-7f3a")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router is infallible");
    assert_eq!(response.headers()["x-request-id"], "edge-7f3a");
}

#[tokio::test]
async fn showcase_routes_serve_configured_content() {
    let repo = FakeCatalog::with_manga(Vec::new());
    let config = manga_catalog::cache::CacheConfig::default();
    let store: Arc<dyn manga_catalog::cache::CacheStore> =
        Arc::new(manga_catalog::cache::MemoryCacheStore::new(&config));
    let harness = Harness::build(
        repo,
        config,
        store,
        support::cdn_settings(),
        ShowcaseSettings {
            banners: vec![BannerSettings {
                image: "banners/summer.jpg".into(),
                title: Some("Summer".into()),
                link: None,
                manga_id: Some(1),
                sort_order: 0,
                enabled: true,
            }],
            avatars: AvatarSettings {
                prefix: "/avatars/".into(),
                suffix: ".png".into(),
                names: vec!["fox".into()],
            },
            announcements: vec![
                AnnouncementSettings {
                    title: "Old news".into(),
                    content: "hidden".into(),
                    kind: "info".into(),
                    link: None,
                    sort_order: 0,
                    enabled: false,
                },
                AnnouncementSettings {
                    title: "Later".into(),
                    content: "second".into(),
                    kind: "info".into(),
                    link: None,
                    sort_order: 2,
                    enabled: true,
                },
                AnnouncementSettings {
                    title: "Maintenance".into(),
                    content: "first".into(),
                    kind: "warning".into(),
                    link: Some("/notice/1".into()),
                    sort_order: 1,
                    enabled: true,
                },
            ],
        },
    );

    let (status, body) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/banners",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"][0]["imageUrl"],
        json!(format!("{CDN_BASE}/banners/summer.jpg"))
    );

    let (_, body) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/avatars",
        None,
    )
    .await;
    assert_eq!(
        body["data"]["urls"],
        json!([format!("{CDN_BASE}/avatars/fox.png")])
    );

    let (status, body) = call(
        build_router(harness.http_state()),
        Method::GET,
        "/api/announcements",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([
            {
                "title": "Maintenance",
                "content": "first",
                "type": "warning",
                "link": "/notice/1",
                "sortOrder": 1
            },
            {
                "title": "Later",
                "content": "second",
                "type": "info",
                "link": null,
                "sortOrder": 2
            }
        ])
    );
}

#[tokio::test]
async fn health_reflects_store_reachability() {
    let harness = harness();

    let response = send(build_router(harness.http_state()), Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    harness.repo.fail_reads.store(true, Ordering::SeqCst);
    let response = send(build_router(harness.http_state()), Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = send(
        build_admin_router(harness.admin_state()),
        Method::GET,
        "/health",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn admin_routes_are_not_on_the_public_router() {
    let harness = harness();
    let response = send(
        build_router(harness.http_state()),
        Method::DELETE,
        "/api/admin/manga/1",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(harness.repo.stored_manga(1).is_some());
}

#[tokio::test]
async fn import_then_read_through_public_router() {
    let harness = harness();
    let public = build_router(harness.http_state());
    let admin = build_admin_router(harness.admin_state());

    let (_, before) = call(public.clone(), Method::GET, "/api/manga", None).await;
    assert_eq!(before["data"]["totalElements"], json!(2));

    let (status, body) = call(
        admin.clone(),
        Method::POST,
        "/api/admin/manga/import",
        Some(json!({
            "title": "Dorohedoro",
            "coverImageUrl": format!("{CDN_BASE}/covers/doro.jpg"),
            "tags": ["dark"],
            "chapters": [
                {"title": "Caiman", "chapterNumber": 1, "pageUrls": ["/pages/doro/1.jpg"]}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], json!("manga imported"));
    let id = body["data"]["id"].as_i64().expect("new id");
    assert_eq!(
        harness.repo.stored_manga(id).expect("stored").cover_image.as_str(),
        "/covers/doro.jpg"
    );

    let (_, after) = call(public, Method::GET, "/api/manga", None).await;
    assert_eq!(after["data"]["totalElements"], json!(3));
}

#[tokio::test]
async fn import_validation_and_malformed_json_are_rejected() {
    let harness = harness();
    let admin = build_admin_router(harness.admin_state());

    let (status, body) = call(
        admin.clone(),
        Method::POST,
        "/api/admin/manga/import",
        Some(json!({"title": "No cover"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("validation_error"));

    let response = admin
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/admin/manga/import")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .expect("request"),
        )
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chapter_create_conflict_and_delete() {
    let harness = harness();
    let admin = build_admin_router(harness.admin_state());

    let (status, body) = call(
        admin.clone(),
        Method::POST,
        "/api/chapters",
        Some(json!({
            "mangaId": 1,
            "title": "Next",
            "chapterNumber": 2,
            "pageUrls": ["pages/1/2/1.jpg"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let chapter_id = body["data"]["id"].as_i64().expect("chapter id");

    let (status, body) = call(
        admin.clone(),
        Method::POST,
        "/api/chapters",
        Some(json!({
            "mangaId": 1,
            "title": "Again",
            "chapterNumber": 2,
            "pageUrls": ["pages/1/2/1.jpg"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("conflict"));

    let uri = format!("/api/admin/chapters/{chapter_id}");
    let (status, body) = call(admin.clone(), Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let (status, _) = call(admin, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_manga_evicts_cached_detail() {
    let harness = harness();
    let public = build_router(harness.http_state());
    let admin = build_admin_router(harness.admin_state());

    let (status, _) = call(public.clone(), Method::GET, "/api/manga/1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(admin, Method::DELETE, "/api/admin/manga/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("manga deleted"));

    let (status, _) = call(public, Method::GET, "/api/manga/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
