mod helpers;

use helpers::{setup_test_app, upload, PUBLIC_BASE};

#[tokio::test]
async fn test_catalog_lists_files_in_first_store_order() {
    let app = setup_test_app(&[]);
    let client = app.client();

    for name in ["b.webp", "a.webp", "c.webp"] {
        upload(client, name, b"RIFF").await.assert_status_ok();
    }
    // A re-upload keeps its original position.
    upload(client, "b.webp", b"RIFF2").await.assert_status_ok();

    let response = client.get("/catalog").await;
    assert_eq!(response.status_code(), 200);

    let entries: Vec<serde_json::Value> = response.json();
    let urls: Vec<&str> = entries
        .iter()
        .map(|e| e["public_url"].as_str().unwrap())
        .collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/b.webp", PUBLIC_BASE),
            format!("{}/a.webp", PUBLIC_BASE),
            format!("{}/c.webp", PUBLIC_BASE),
        ]
    );
    assert!(entries.iter().all(|e| e["uuid"].is_string()));
}

#[tokio::test]
async fn test_catalog_entry_by_uuid() {
    let app = setup_test_app(&[]);
    let client = app.client();

    let uploaded: serde_json::Value = upload(client, "x.jpg", b"JPEG").await.json();
    let uuid = uploaded["uuid"].as_str().unwrap();

    let response = client.get(&format!("/catalog/{}", uuid)).await;
    assert_eq!(response.status_code(), 200);

    let entry: serde_json::Value = response.json();
    assert_eq!(entry["uuid"], uuid);
    assert_eq!(entry["public_url"], format!("{}/x.jpg", PUBLIC_BASE));
    assert_eq!(entry["backend_key"], "x.jpg");
    assert_eq!(entry["backend"], "memory");
    assert_eq!(entry["file_key"]["namespace"], "CMS");
    assert_eq!(entry["file_key"]["key_value"], "/x.jpg");
}

#[tokio::test]
async fn test_unknown_catalog_entry_is_404() {
    let app = setup_test_app(&[]);

    let response = app
        .client()
        .get("/catalog/5f0c6c4e-8a55-4a8e-9a47-0b4a2f1d7c11")
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_malformed_catalog_id_is_404() {
    let app = setup_test_app(&[]);

    let response = app.client().get("/catalog/not-a-uuid").await;
    assert_eq!(response.status_code(), 404);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}
