use actix_web::HttpResponse;

pub async fn check() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body("<h1>Server started</h1>")
}
