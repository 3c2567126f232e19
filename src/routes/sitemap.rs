use actix_web::http::header::ContentType;
use actix_web::web;
use actix_web::HttpResponse;
use chrono::NaiveDate;
use chrono::Utc;

use crate::startup::SiteBaseUrl;

/// The site is a single page, so the sitemap has a single entry, marked as
/// changing daily and "modified" today.
fn render_sitemap(
    base_url: &str,
    last_modified: NaiveDate,
) -> String {
    // `&` is common in urls and must be an entity in xml
    let base_url = htmlescape::encode_minimal(base_url);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>{base_url}</loc>
    <lastmod>{last_modified}</lastmod>
    <changefreq>daily</changefreq>
    <priority>1.0</priority>
  </url>
</urlset>
"#
    )
}

/// `GET /sitemap.xml`
pub async fn sitemap(base_url: web::Data<SiteBaseUrl>) -> HttpResponse {
    let body = render_sitemap(&base_url.0, Utc::now().date_naive());
    HttpResponse::Ok()
        .content_type(ContentType::xml())
        .body(body)
}
