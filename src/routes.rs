use actix_web::web;

use crate::db::Stores;
use crate::errors::AppError;
use crate::handlers;

/// Mounts every route along with the injected stores.
pub fn configure(cfg: &mut web::ServiceConfig, stores: &Stores) {
    cfg.app_data(web::Data::from(stores.records.clone()))
        .app_data(web::Data::from(stores.blobs.clone()))
        .app_data(
            web::JsonConfig::default()
                .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
        )
        .service(
            web::resource("/")
                .route(web::get().to(handlers::employee::get_employees)),
        )
        .service(
            web::resource("/check")
                .route(web::get().to(handlers::health::check)),
        )
        .service(
            web::resource("/upload")
                .route(web::post().to(handlers::image::upload_file)),
        )
        .service(
            web::resource("/create")
                .route(web::post().to(handlers::employee::create_employee)),
        )
        .service(
            web::resource("/viewdetail/{id}")
                .route(web::get().to(handlers::employee::get_employee_detail)),
        )
        .service(
            web::resource("/image/{id}")
                .route(web::get().to(handlers::image::get_image)),
        )
        .service(
            web::resource("/delete/{id}")
                .route(web::delete().to(handlers::employee::delete_employee)),
        )
        .service(
            web::resource("/update/{id}")
                .route(web::put().to(handlers::employee::update_employee)),
        );
}

#[cfg(test)]
mod tests {
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};

    use super::configure;
    use crate::db::Stores;

    #[actix_web::test]
    async fn check_reports_liveness() {
        let stores = Stores::in_memory();
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &stores))).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/check").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        assert_eq!(test::read_body(resp).await, "<h1>Server started</h1>");
    }

    #[actix_web::test]
    async fn empty_store_lists_nothing() {
        let stores = Stores::in_memory();
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &stores))).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "[]");
    }
}
