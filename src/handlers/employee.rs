use actix_web::{web, HttpResponse};
use log::{info, warn};

use crate::db::{BlobStore, RecordStore};
use crate::errors::AppError;
use crate::models::employee::{CreateEmployeeRequest, EmployeeUpdate, MessageResponse, UpdateResponse};
use crate::utils::validation::validate_payload;

fn employee_not_found() -> AppError {
    AppError::NotFound("Employee not found".to_string())
}

pub async fn get_employees(records: web::Data<dyn RecordStore>) -> Result<HttpResponse, AppError> {
    let employees = records
        .find_all()
        .await
        .map_err(|err| AppError::database("Failed to fetch employees", err))?;

    Ok(HttpResponse::Ok().json(employees))
}

pub async fn create_employee(
    records: web::Data<dyn RecordStore>,
    new_employee: web::Json<CreateEmployeeRequest>,
) -> Result<HttpResponse, AppError> {
    let new_employee = new_employee.into_inner().into_new_employee()?;

    let created = records
        .insert(new_employee)
        .await
        .map_err(|err| AppError::database("Failed to create employee", err))?;
    info!("Created employee {} ({})", created.employee_id, created.id);

    Ok(HttpResponse::Created().json(created))
}

pub async fn get_employee_detail(
    records: web::Data<dyn RecordStore>,
    employee_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let employee = records
        .find_by_employee_id(&employee_id)
        .await
        .map_err(|err| AppError::database("Failed to fetch employee", err))?
        .ok_or_else(employee_not_found)?;

    Ok(HttpResponse::Ok().json(employee))
}

pub async fn update_employee(
    records: web::Data<dyn RecordStore>,
    employee_id: web::Path<String>,
    updates: web::Json<EmployeeUpdate>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*updates)?;

    let updated = records
        .update_by_employee_id(&employee_id, &updates)
        .await
        .map_err(|err| AppError::database("Error updating employee", err))?
        .ok_or_else(employee_not_found)?;

    Ok(HttpResponse::Ok().json(UpdateResponse {
        message: "Employee updated successfully".to_string(),
        data: updated,
    }))
}

/// Removes the employee's image first, then the record. A failed image
/// delete is logged and does not stop the record delete.
pub async fn delete_employee(
    records: web::Data<dyn RecordStore>,
    blobs: web::Data<dyn BlobStore>,
    employee_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let employee = records
        .find_by_employee_id(&employee_id)
        .await
        .map_err(|err| AppError::database("Failed to delete employee", err))?
        .ok_or_else(employee_not_found)?;

    if let Some(image_id) = employee.profile_image.as_deref().filter(|id| !id.is_empty()) {
        if let Err(err) = blobs.delete(image_id).await {
            warn!("Error deleting image {} of employee {} (might not exist): {}", image_id, employee.employee_id, err);
        }
    }

    records
        .delete_by_employee_id(&employee_id)
        .await
        .map_err(|err| AppError::database("Failed to delete employee", err))?;
    info!("Deleted employee {}", employee.employee_id);

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Employee deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use crate::db::Stores;
    use crate::models::employee::{Employee, UpdateResponse};
    use crate::routes;

    fn ann() -> Value {
        json!({
            "name": "Ann",
            "phone": "555",
            "dateOfBirth": "1990-01-01",
            "dateOfJoining": "2020-06-01",
            "department": "Engineering",
            "employmentStatus": "Active",
            "gender": "F",
            "address": { "city": "X", "district": "Y", "state": "Z" }
        })
    }

    macro_rules! app {
        ($stores:expr) => {
            test::init_service(App::new().configure(|cfg| routes::configure(cfg, &$stores))).await
        };
    }

    #[actix_web::test]
    async fn create_derives_employee_id() {
        let stores = Stores::in_memory();
        let app = app!(stores);

        let req = test::TestRequest::post().uri("/create").set_json(ann()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let created: Employee = test::read_body_json(resp).await;
        assert_eq!(created.employee_id, "E-2020");
        assert_eq!(created.profile_image, None);
        assert_eq!(created.address.state.as_deref(), Some("Z"));
    }

    #[actix_web::test]
    async fn create_without_required_field_persists_nothing() {
        let stores = Stores::in_memory();
        let app = app!(stores);

        for field in ["name", "phone", "dateOfBirth", "dateOfJoining", "department", "employmentStatus", "gender"] {
            let mut body = ann();
            body.as_object_mut().unwrap().remove(field);
            let req = test::TestRequest::post().uri("/create").set_json(body).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "missing {}", field);

            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], "Missing required fields");
            assert_eq!(body["fields"], json!([field]));
        }

        assert!(stores.records.find_all().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn create_with_bad_date_is_rejected() {
        let stores = Stores::in_memory();
        let app = app!(stores);

        let mut body = ann();
        body["dateOfJoining"] = json!("someday");
        let req = test::TestRequest::post().uri("/create").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(stores.records.find_all().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn malformed_json_is_a_json_400() {
        let stores = Stores::in_memory();
        let app = app!(stores);

        let req = test::TestRequest::post()
            .uri("/create")
            .insert_header(("content-type", "application/json"))
            .set_payload("{ not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn list_returns_records_in_insertion_order() {
        let stores = Stores::in_memory();
        let app = app!(stores);

        let mut second = ann();
        second["name"] = json!("Bob");
        second["department"] = json!("sales");
        for body in [ann(), second] {
            let req = test::TestRequest::post().uri("/create").set_json(body).to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get().uri("/").to_request();
        let list: Vec<Employee> = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<&str> = list.iter().map(|e| e.employee_id.as_str()).collect();
        assert_eq!(ids, vec!["E-2020", "S-2020"]);
    }

    #[actix_web::test]
    async fn unknown_id_is_404_for_detail_update_and_delete() {
        let stores = Stores::in_memory();
        let app = app!(stores);

        let req = test::TestRequest::get().uri("/viewdetail/Q-1900").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete().uri("/delete/Q-1900").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::put()
            .uri("/update/Q-1900")
            .set_json(json!({ "name": "Zed" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn update_changes_only_allow_listed_fields() {
        let stores = Stores::in_memory();
        let app = app!(stores);

        let mut body = ann();
        body["imageId"] = json!("3f1c0f8e-0d4b-4f5e-9a77-2b1f3c4d5e6f");
        let req = test::TestRequest::post().uri("/create").set_json(body).to_request();
        let created: Employee = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::put()
            .uri("/update/E-2020")
            .set_json(json!({
                "name": "Ann Lee",
                "department": "Marketing",
                "marital": "True",
                "address": { "city": "Bhopal", "district": "Y", "state": "Z" },
                "employeeId": "M-1999",
                "profileImage": null,
                "gender": "M"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let updated: UpdateResponse = test::read_body_json(resp).await;
        assert_eq!(updated.message, "Employee updated successfully");
        assert_eq!(updated.data.name, "Ann Lee");
        assert_eq!(updated.data.department, "Marketing");
        assert_eq!(updated.data.address.city.as_deref(), Some("Bhopal"));
        assert_eq!(updated.data.employee_id, "E-2020");
        assert_eq!(updated.data.profile_image, created.profile_image);
        assert_eq!(updated.data.gender, "F");
        assert_eq!(updated.data.phone, "555");

        let req = test::TestRequest::get().uri("/viewdetail/E-2020").to_request();
        let fetched: Employee = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched, updated.data);
    }

    #[actix_web::test]
    async fn update_rejects_empty_name() {
        let stores = Stores::in_memory();
        let app = app!(stores);

        let req = test::TestRequest::post().uri("/create").set_json(ann()).to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::put()
            .uri("/update/E-2020")
            .set_json(json!({ "name": "" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn delete_removes_record() {
        let stores = Stores::in_memory();
        let app = app!(stores);

        let req = test::TestRequest::post().uri("/create").set_json(ann()).to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::delete().uri("/delete/E-2020").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Employee deleted successfully");

        let req = test::TestRequest::get().uri("/viewdetail/E-2020").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn delete_survives_dangling_image_reference() {
        let stores = Stores::in_memory();
        let app = app!(stores);

        let mut body = ann();
        body["imageId"] = json!("not-a-stored-image");
        let req = test::TestRequest::post().uri("/create").set_json(body).to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::delete().uri("/delete/E-2020").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        assert!(stores.records.find_all().await.unwrap().is_empty());
    }
}
