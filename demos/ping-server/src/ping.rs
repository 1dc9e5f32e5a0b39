use modrouter::openapi::{OpenApiMeta, Operation, Parameter, Schema};
use modrouter::prelude::*;
use serde::Serialize;
use std::sync::Arc;

pub trait PingService: Send + Sync {
    fn pong(&self) -> String;
}

pub struct Pong;

impl PingService for Pong {
    fn pong(&self) -> String {
        "pong".to_string()
    }
}

#[derive(Serialize)]
struct PingResponse {
    message: Vec<String>,
}

/// `GET /api/v1/ping`, also bound to the `app.ping` action.
#[derive(Clone, Default, Endpoint)]
pub struct Ping {
    #[route(method = "GET", path = "/api/v1/ping")]
    #[action(name = "app.ping", keys = "ctrl+p")]
    meta: Pattern,

    #[bind(query = "times", header = "X-Ping-Times", default = "1")]
    times: i64,

    #[inject(name = "PingService")]
    service: Option<Arc<dyn PingService>>,
}

#[async_trait]
impl Handler for Ping {
    async fn handle(&mut self, _ctx: &mut Context) -> HandlerResult {
        let service = require(&self.service, "PingService")?;
        let times = self.times.max(1) as usize;
        reply(PingResponse {
            message: (0..times).map(|_| service.pong()).collect(),
        })
    }
}

impl OpenApiMeta for Ping {
    fn openapi_meta() -> Operation {
        Operation::new()
            .summary("Ping - returns one or more \"pong\" strings")
            .description("Optional query-param `times` repeats the reply. Example: `/api/v1/ping?times=3`")
            .parameter(Parameter::query("times").schema(Schema::integer().minimum(1.0)))
            .response(200, "PingResponse")
    }
}

/// `GET /api/v1/echo/{word}`: repeats a path segment, optionally upper-cased.
#[derive(Clone, Default, Endpoint)]
pub struct Echo {
    #[route(method = "GET", path = "/api/v1/echo/{word}")]
    meta: Pattern,

    #[bind(path = "word")]
    word: String,

    #[bind(query = "shout")]
    shout: bool,
}

#[async_trait]
impl Handler for Echo {
    async fn handle(&mut self, ctx: &mut Context) -> HandlerResult {
        if self.word.len() > 64 {
            return Err(HttpError::bad_request("word too long").into());
        }
        if let Some(agent) = ctx.header("user-agent") {
            tracing::debug!(agent, "echo request");
        }
        let word = if self.shout {
            self.word.to_uppercase()
        } else {
            self.word.clone()
        };
        reply(serde_json::json!({ "echo": word }))
    }
}
