use rocket::serde::json::{json, Value};
use rocket::{catchers, Catcher, Request};

#[rocket::catch(404)]
fn not_found(req: &Request) -> Value {
    json!({ "error": format!("'{}' not found", req.uri()) })
}

#[rocket::catch(400)]
fn bad_request() -> Value {
    json!({ "error": "Bad request" })
}

#[rocket::catch(422)]
fn unprocessable_entity() -> Value {
    json!({ "error": "Request body could not be parsed" })
}

#[rocket::catch(500)]
fn internal_error() -> Value {
    json!({ "error": "Internal server error" })
}

pub fn catchers() -> Vec<Catcher> {
    catchers![not_found, bad_request, unprocessable_entity, internal_error]
}
