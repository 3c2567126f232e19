use crate::helpers::spawn_app_with;

#[tokio::test]
async fn sitemap_lists_the_site() {
    let app = spawn_app_with(|cfg| {
        cfg.application.base_url = "https://www.vemosvamos.com".to_string();
    })
    .await;

    let resp = reqwest::get(format!("{}/sitemap.xml", app.addr))
        .await
        .expect("execute request");

    assert_eq!(resp.status().as_u16(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.contains("xml"), "got {content_type}");

    let body = resp.text().await.unwrap();
    assert!(body.starts_with("<?xml"));
    assert!(body.contains("<loc>https://www.vemosvamos.com</loc>"));
}
