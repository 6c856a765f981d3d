//! # Actix Binding
//!
//! Mounts an [`OpenApiHandler`] as the default service of an actix-web app.
//! Actix still speaks `http` 0.2, so heads and responses are rebuilt on the
//! way in and out.

use actix_web::{
    http::StatusCode as ActixStatusCode,
    web::{self, ServiceConfig},
    HttpRequest, HttpResponse,
};
use futures::StreamExt;
use rpc_rest_core::{OpenApiHandler, OpenApiRequest, OpenApiResponse, RequestBody, RequestHead};
use std::io;

macro_rules! error_msg {
    ($msg:literal, $code:literal) => {
        concat!("{\"message\":\"", $msg, "\",\"code\":\"", $code, "\"}").as_bytes()
    };
}

/// Routes every request not claimed by another service through `handler`.
pub fn configure<Ctx>(handler: web::Data<OpenApiHandler<Ctx>>) -> impl FnOnce(&mut ServiceConfig)
where
    Ctx: Clone + Send + Sync + 'static,
{
    move |app| {
        app.app_data(handler).default_service(web::to(dispatch::<Ctx>));
    }
}

async fn dispatch<Ctx>(
    req: HttpRequest,
    payload: web::Payload,
    handler: web::Data<OpenApiHandler<Ctx>>,
) -> HttpResponse
where
    Ctx: Clone + Send + Sync + 'static,
{
    let head = match to_request_head(&req) {
        Ok(head) => head,
        Err(err) => {
            tracing::warn!("Rejecting request that cannot be represented: {}", err);
            return HttpResponse::BadRequest()
                .content_type("application/json")
                .body(error_msg!("Malformed request", "BAD_REQUEST"));
        }
    };

    let body = RequestBody::from_stream(
        payload.map(|chunk| chunk.map_err(|err| io::Error::other(err.to_string()))),
    );
    let res = handler.handle(OpenApiRequest::new(head, body)).await;
    to_actix_response(res)
}

fn to_request_head(req: &HttpRequest) -> Result<RequestHead, http::Error> {
    let method = http::Method::from_bytes(req.method().as_str().as_bytes())?;
    let uri = req.uri().to_string().parse::<http::Uri>()?;
    let mut head = RequestHead::new(method, uri);
    for (name, value) in req.headers() {
        head.headers.append(
            http::HeaderName::from_bytes(name.as_str().as_bytes())?,
            http::HeaderValue::from_bytes(value.as_bytes())?,
        );
    }
    Ok(head)
}

fn to_actix_response(res: OpenApiResponse) -> HttpResponse {
    let status = match ActixStatusCode::from_u16(res.status().as_u16()) {
        Ok(status) => status,
        Err(err) => {
            tracing::error!("Invalid status code: {}", err);
            return HttpResponse::InternalServerError()
                .content_type("application/json")
                .body(error_msg!("An error occurred", "INTERNAL_SERVER_ERROR"));
        }
    };

    let (parts, body) = res.into_parts();
    let mut builder = HttpResponse::build(status);
    for (name, value) in parts.headers.iter() {
        builder.append_header((name.as_str(), value.as_bytes()));
    }
    builder.body(body)
}
