mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestApp;
use library_records::{
    AppError, AppResult, Book, BookInput, BorrowingInput, BorrowingRecord, LibraryStore, Member, MemberInput,
};
use serde_json::json;
use std::sync::Arc;

fn today() -> String {
    Utc::now().date_naive().to_string()
}

async fn book_available(app: &TestApp, id: i64) -> bool {
    let (_, book) = app.get(&format!("/api/books/{}/", id)).await;
    book["is_available"].as_bool().unwrap()
}

#[tokio::test]
async fn lend_second_lend_and_return() {
    let app = TestApp::new();
    let book = app.create_book("Dune").await;
    let ada = app.create_member("Ada", "ada@example.com").await;
    let grace = app.create_member("Grace", "grace@example.com").await;

    let (status, record) = app
        .post("/api/borrowings/", json!({ "book": book, "member": ada }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{record}");
    assert_eq!(record["book"], book);
    assert_eq!(record["member"], ada);
    assert_eq!(record["borrowed_date"], today());
    assert!(record["returned_date"].is_null());
    assert!(!book_available(&app, book).await);

    let (status, err) = app
        .post("/api/borrowings/", json!({ "book": book, "member": grace }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        err["error"]["details"]["non_field_errors"],
        json!(["This book is currently unavailable."])
    );
    let (_, all) = app.get("/api/borrowings/").await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let id = record["id"].as_i64().unwrap();
    let (status, returned) = app
        .put(
            &format!("/api/borrowings/{}/", id),
            json!({ "book": book, "member": ada, "returned_date": today() }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{returned}");
    assert_eq!(returned["returned_date"], today());
    assert!(book_available(&app, book).await);

    let (status, _) = app
        .post("/api/borrowings/", json!({ "book": book, "member": grace }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(!book_available(&app, book).await);
}

#[tokio::test]
async fn returning_twice_does_not_release_a_relent_book() {
    let app = TestApp::new();
    let book = app.create_book("Dune").await;
    let member = app.create_member("Ada", "ada@example.com").await;

    let (_, first) = app
        .post("/api/borrowings/", json!({ "book": book, "member": member }))
        .await;
    let first_uri = format!("/api/borrowings/{}/", first["id"]);
    let returned = json!({ "book": book, "member": member, "returned_date": today() });
    assert_eq!(app.put(&first_uri, returned.clone()).await.0, StatusCode::OK);

    app.post("/api/borrowings/", json!({ "book": book, "member": member }))
        .await;
    assert!(!book_available(&app, book).await);

    assert_eq!(app.put(&first_uri, returned).await.0, StatusCode::OK);
    assert!(!book_available(&app, book).await);
}

#[tokio::test]
async fn clearing_a_returned_date_is_rejected() {
    let app = TestApp::new();
    let book = app.create_book("Dune").await;
    let ada = app.create_member("Ada", "ada@example.com").await;
    let grace = app.create_member("Grace", "grace@example.com").await;

    let (_, first) = app
        .post("/api/borrowings/", json!({ "book": book, "member": ada }))
        .await;
    let first_uri = format!("/api/borrowings/{}/", first["id"]);
    let returned = json!({ "book": book, "member": ada, "returned_date": today() });
    assert_eq!(app.put(&first_uri, returned.clone()).await.0, StatusCode::OK);
    let (status, _) = app
        .post("/api/borrowings/", json!({ "book": book, "member": grace }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, err) = app
        .put(&first_uri, json!({ "book": book, "member": ada, "returned_date": null }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        err["error"]["details"]["returned_date"],
        json!(["Returned date cannot be cleared once set."])
    );
    let (_, stored) = app.get(&first_uri).await;
    assert_eq!(stored["returned_date"], today());

    assert_eq!(app.put(&first_uri, returned).await.0, StatusCode::OK);
    assert!(!book_available(&app, book).await);
}

#[tokio::test]
async fn return_before_borrow_is_rejected() {
    let app = TestApp::new();
    let book = app.create_book("Dune").await;
    let member = app.create_member("Ada", "ada@example.com").await;
    let (_, record) = app
        .post("/api/borrowings/", json!({ "book": book, "member": member }))
        .await;

    let yesterday = (Utc::now().date_naive() - Duration::days(1)).to_string();
    let (status, err) = app
        .put(
            &format!("/api/borrowings/{}/", record["id"]),
            json!({ "book": book, "member": member, "returned_date": yesterday }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        err["error"]["details"]["non_field_errors"],
        json!(["Returned date cannot be before borrowed date."])
    );
    assert!(!book_available(&app, book).await);

    let (status, _) = app
        .post(
            "/api/borrowings/",
            json!({ "book": book, "member": member, "returned_date": yesterday }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_references_are_field_errors() {
    let app = TestApp::new();
    let member = app.create_member("Ada", "ada@example.com").await;
    let (status, err) = app
        .post("/api/borrowings/", json!({ "book": 404, "member": member }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        err["error"]["details"]["book"],
        json!(["Invalid pk \"404\" - object does not exist."])
    );

    let (status, err) = app.post("/api/borrowings/", json!({ "member": "one" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"]["details"]["book"], json!(["This field is required."]));
    assert!(err["error"]["details"]["member"].is_array());
}

#[tokio::test]
async fn deleting_a_book_or_member_removes_its_records() {
    let app = TestApp::new();
    let dune = app.create_book("Dune").await;
    let emma = app.create_book("Emma").await;
    let ada = app.create_member("Ada", "ada@example.com").await;
    let grace = app.create_member("Grace", "grace@example.com").await;

    app.post("/api/borrowings/", json!({ "book": dune, "member": ada })).await;
    app.post("/api/borrowings/", json!({ "book": emma, "member": grace })).await;

    assert_eq!(app.delete(&format!("/api/books/{}/", dune)).await.0, StatusCode::NO_CONTENT);
    let (_, all) = app.get("/api/borrowings/").await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert_eq!(all[0]["book"], emma);

    assert_eq!(app.delete(&format!("/api/members/{}/", grace)).await.0, StatusCode::NO_CONTENT);
    let (_, all) = app.get("/api/borrowings/").await;
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn deleting_an_open_record_keeps_the_book_unavailable() {
    let app = TestApp::new();
    let book = app.create_book("Dune").await;
    let member = app.create_member("Ada", "ada@example.com").await;
    let (_, record) = app
        .post("/api/borrowings/", json!({ "book": book, "member": member }))
        .await;

    let uri = format!("/api/borrowings/{}/", record["id"]);
    assert_eq!(app.delete(&uri).await.0, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&uri).await.0, StatusCode::NOT_FOUND);
    assert!(!book_available(&app, book).await);
}

/// Store whose every operation fails the way a lost database connection does.
struct BrokenStore;

fn broken<T>() -> AppResult<T> {
    Err(AppError::Internal("connection reset by peer at 10.0.0.7:5432".into()))
}

#[async_trait]
impl LibraryStore for BrokenStore {
    async fn ping(&self) -> AppResult<()> {
        broken()
    }
    async fn count_books(&self) -> AppResult<u64> {
        broken()
    }
    async fn list_books(&self, _: u64, _: u64) -> AppResult<Vec<Book>> {
        broken()
    }
    async fn get_book(&self, _: i64) -> AppResult<Option<Book>> {
        broken()
    }
    async fn create_book(&self, _: BookInput) -> AppResult<Book> {
        broken()
    }
    async fn replace_book(&self, _: i64, _: BookInput) -> AppResult<Option<Book>> {
        broken()
    }
    async fn delete_book(&self, _: i64) -> AppResult<bool> {
        broken()
    }
    async fn count_members(&self) -> AppResult<u64> {
        broken()
    }
    async fn list_members(&self, _: u64, _: u64) -> AppResult<Vec<Member>> {
        broken()
    }
    async fn get_member(&self, _: i64) -> AppResult<Option<Member>> {
        broken()
    }
    async fn create_member(&self, _: MemberInput) -> AppResult<Member> {
        broken()
    }
    async fn replace_member(&self, _: i64, _: MemberInput) -> AppResult<Option<Member>> {
        broken()
    }
    async fn delete_member(&self, _: i64) -> AppResult<bool> {
        broken()
    }
    async fn list_borrowings(&self) -> AppResult<Vec<BorrowingRecord>> {
        broken()
    }
    async fn get_borrowing(&self, _: i64) -> AppResult<Option<BorrowingRecord>> {
        broken()
    }
    async fn create_borrowing(&self, _: BorrowingInput) -> AppResult<BorrowingRecord> {
        broken()
    }
    async fn replace_borrowing(&self, _: i64, _: BorrowingInput) -> AppResult<Option<BorrowingRecord>> {
        broken()
    }
    async fn delete_borrowing(&self, _: i64) -> AppResult<bool> {
        broken()
    }
}

#[tokio::test]
async fn store_faults_are_opaque_500s() {
    let app = TestApp::with_store(Arc::new(BrokenStore));

    for uri in ["/api/books/", "/api/members/1/", "/api/borrowings/"] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(
            body,
            json!({ "error": { "code": "internal_error", "message": "internal server error" } })
        );
        assert!(!body.to_string().contains("10.0.0.7"));
    }

    let (status, _) = app.post("/api/books/", common::book_body("Dune")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let request = axum::http::Request::builder()
        .uri("/ready")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = app.raw(request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
}
