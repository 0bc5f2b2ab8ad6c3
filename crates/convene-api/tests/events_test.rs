//! Event creation, reads, sparse updates, media tickets and host-only writes.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn create_enrolls_the_host_and_derives_a_slug() {
    let app = TestApp::new();
    let (ada, cookie) = app.signed_up("Ada", "ada@example.com").await;

    let res = app
        .send(
            Method::POST,
            "/event",
            Some(&cookie),
            Some(json!({
                "title": "My Great Talk!",
                "description": "All about engines",
                "location": "London",
                "date": "2025-06-01T18:30"
            })),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    let event = &res.body["event"];
    assert_eq!(event["slug"], "my-great-talk");
    assert_eq!(event["host_id"], ada);
    assert_eq!(event["is_enrolled"], true);
    assert_eq!(event["location"], "London");
    assert!(res.body["uploads"].as_array().unwrap().is_empty());

    let mine = app.send(Method::GET, "/user-events", Some(&cookie), None).await;
    assert_eq!(mine.body[0]["role"], "host");
}

#[tokio::test]
async fn create_requires_authentication_and_a_title() {
    let app = TestApp::new();
    let res = app
        .send(Method::POST, "/event", None, Some(json!({ "title": "Anonymous" })))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let (_, cookie) = app.signed_up("Ada", "ada@example.com").await;
    let res = app
        .send(
            Method::POST,
            "/event",
            Some(&cookie),
            Some(json!({ "title": "  ", "date": "someday" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["fields"][0]["field"], "title");
    assert_eq!(res.body["fields"][1]["field"], "date");
}

#[tokio::test]
async fn same_title_gets_a_suffixed_slug() {
    let app = TestApp::new();
    let (_, cookie) = app.signed_up("Ada", "ada@example.com").await;

    let first = app.create_event(&cookie, "Rust Meetup").await;
    let second = app.create_event(&cookie, "Rust Meetup").await;
    let third = app.create_event(&cookie, "rust   meetup").await;

    assert_eq!(first["slug"], "rust-meetup");
    assert_eq!(second["slug"], "rust-meetup-2");
    assert_eq!(third["slug"], "rust-meetup-3");
}

#[tokio::test]
async fn accented_and_non_latin_titles_keep_readable_slugs() {
    let app = TestApp::new();
    let (_, cookie) = app.signed_up("Ada", "ada@example.com").await;

    let accented = app.create_event(&cookie, "Café Ñandú").await;
    assert_eq!(accented["slug"], "cafe-nandu");
    let res = app.send(Method::GET, "/event/cafe-nandu", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["title"], "Café Ñandú");

    let japanese = app.create_event(&cookie, "日本語").await;
    assert_eq!(japanese["slug"], "日本語");
    let res = app
        .send(Method::GET, "/event/%E6%97%A5%E6%9C%AC%E8%AA%9E", None, None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["title"], "日本語");
}

#[tokio::test]
async fn is_enrolled_only_appears_for_authenticated_readers() {
    let app = TestApp::new();
    let (_, ada) = app.signed_up("Ada", "ada@example.com").await;
    let (_, bob) = app.signed_up("Bob", "bob@example.com").await;
    let event = app.create_event(&ada, "Open Day").await;
    let uri = format!("/event/{}", event["slug"].as_str().unwrap());

    let host_view = app.send(Method::GET, &uri, Some(&ada), None).await;
    assert_eq!(host_view.body["is_enrolled"], true);

    let bob_view = app.send(Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(bob_view.body["is_enrolled"], false);

    let anonymous = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(anonymous.status, StatusCode::OK);
    assert!(anonymous.body.get("is_enrolled").is_none());

    let missing = app.send(Method::GET, "/event/no-such-event", None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_searches_titles_and_pages() {
    let app = TestApp::new();
    let (_, cookie) = app.signed_up("Ada", "ada@example.com").await;
    for title in ["Rust Meetup", "Go Meetup", "Rust Workshop", "100% Fun"] {
        app.create_event(&cookie, title).await;
    }

    let all = app.send(Method::GET, "/event", None, None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body.as_array().unwrap().len(), 4);
    // Newest first.
    assert_eq!(all.body[0]["title"], "100% Fun");

    let rust = app.send(Method::GET, "/event?query=rust", None, None).await;
    let titles: Vec<&str> = rust
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Rust Workshop", "Rust Meetup"]);

    // `%` is matched literally, not as a wildcard.
    let percent = app.send(Method::GET, "/event?query=%25", None, None).await;
    assert_eq!(percent.body.as_array().unwrap().len(), 1);

    let page = app.send(Method::GET, "/event?limit=2&offset=1", None, None).await;
    assert_eq!(page.body.as_array().unwrap().len(), 2);
    assert_eq!(page.body[0]["title"], "Rust Workshop");

    let bad = app.send(Method::GET, "/event?limit=lots", None, None).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn host_updates_sparsely() {
    let app = TestApp::new();
    let (_, cookie) = app.signed_up("Ada", "ada@example.com").await;
    let created = app
        .send(
            Method::POST,
            "/event",
            Some(&cookie),
            Some(json!({ "title": "Draft Title", "description": "keep me", "location": "Paris" })),
        )
        .await;
    let id = created.body["event"]["id"].as_i64().unwrap();

    let res = app
        .send(
            Method::PUT,
            "/event",
            Some(&cookie),
            Some(json!({ "id": id, "title": "Final Title", "location": null })),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    let event = &res.body["event"];
    assert_eq!(event["title"], "Final Title");
    assert_eq!(event["slug"], "final-title");
    assert_eq!(event["description"], "keep me");
    assert!(event["location"].is_null());

    let old = app.send(Method::GET, "/event/draft-title", None, None).await;
    assert_eq!(old.status, StatusCode::NOT_FOUND);

    let res = app
        .send(
            Method::PUT,
            "/event",
            Some(&cookie),
            Some(json!({ "id": id, "description": "rewritten", "title": "Final Title" })),
        )
        .await;
    assert_eq!(res.body["event"]["slug"], "final-title");
    assert_eq!(res.body["event"]["description"], "rewritten");
}

#[tokio::test]
async fn title_cannot_be_cleared() {
    let app = TestApp::new();
    let (_, cookie) = app.signed_up("Ada", "ada@example.com").await;
    let event = app.create_event(&cookie, "Keep Me").await;

    let res = app
        .send(Method::PUT, "/event", Some(&cookie), Some(json!({ "id": event["id"], "title": null })))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["fields"][0]["field"], "title");
}

#[tokio::test]
async fn only_the_host_may_update_or_delete() {
    let app = TestApp::new();
    let (_, ada) = app.signed_up("Ada", "ada@example.com").await;
    let (_, bob) = app.signed_up("Bob", "bob@example.com").await;
    let event = app.create_event(&ada, "Ada's Event").await;
    let id = event["id"].as_i64().unwrap();

    let update = app
        .send(Method::PUT, "/event", Some(&bob), Some(json!({ "id": id, "title": "Hijacked" })))
        .await;
    assert_eq!(update.status, StatusCode::FORBIDDEN);

    let delete = app
        .send(Method::DELETE, &format!("/event/{}", id), Some(&bob), None)
        .await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);

    let unchanged = app.send(Method::GET, "/event/adas-event", None, None).await;
    assert_eq!(unchanged.body["title"], "Ada's Event");

    let missing = app
        .send(Method::PUT, "/event", Some(&ada), Some(json!({ "id": 424242, "title": "x" })))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_event_and_enrollments() {
    let app = TestApp::new();
    let (_, ada) = app.signed_up("Ada", "ada@example.com").await;
    let (_, bob) = app.signed_up("Bob", "bob@example.com").await;
    let event = app.create_event(&ada, "Short Lived").await;
    let id = event["id"].as_i64().unwrap();

    app.send(Method::POST, "/user-events", Some(&bob), Some(json!({ "eventId": id })))
        .await;

    let res = app
        .send(Method::DELETE, &format!("/event/{}", id), Some(&ada), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let bobs = app.send(Method::GET, "/user-events", Some(&bob), None).await;
    assert!(bobs.body.as_array().unwrap().is_empty());

    let again = app
        .send(Method::DELETE, &format!("/event/{}", id), Some(&ada), None)
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let not_a_number = app.send(Method::DELETE, "/event/short-lived", Some(&ada), None).await;
    assert_eq!(not_a_number.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn media_fields_issue_upload_tickets() {
    let app = TestApp::new();
    let (_, cookie) = app.signed_up("Ada", "ada@example.com").await;

    let res = app
        .send(
            Method::POST,
            "/event",
            Some(&cookie),
            Some(json!({
                "title": "Gallery",
                "thumbnail": { "filename": "thumb.png", "content_type": "image/png" }
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let ticket = &res.body["uploads"][0];
    assert_eq!(ticket["field"], "thumbnail");
    assert_eq!(ticket["expires_in"], 30);
    assert!(ticket["upload_url"].as_str().unwrap().starts_with("https://upload.test/events/"));
    assert_eq!(res.body["event"]["thumbnail_url"], ticket["public_url"]);
    assert!(res.body["event"]["banner_url"].is_null());
    let id = res.body["event"]["id"].clone();

    let res = app
        .send(
            Method::PUT,
            "/event",
            Some(&cookie),
            Some(json!({
                "id": id,
                "thumbnail": null,
                "banner": { "filename": "wide.webp", "content_type": "image/webp" }
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["event"]["thumbnail_url"].is_null());
    assert_eq!(res.body["uploads"][0]["field"], "banner");
    assert!(res.body["event"]["banner_url"].as_str().unwrap().ends_with("/banner.webp"));

    let rejected = app
        .send(
            Method::PUT,
            "/event",
            Some(&cookie),
            Some(json!({ "id": id, "banner": { "filename": "x.exe", "content_type": "application/octet-stream" } })),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert_eq!(rejected.body["fields"][0]["field"], "banner");
}
