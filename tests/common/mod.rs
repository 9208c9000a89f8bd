#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::Json;
use axum::extract::{RawQuery, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};

/// Requests observed by the fake backend.
#[derive(Debug, Default)]
pub struct Recorded {
    pub plan_bodies: Vec<Value>,
    pub stream_bodies: Vec<Value>,
    pub preview_queries: Vec<Option<String>>,
}

pub type Shared = Arc<Mutex<Recorded>>;

pub fn minimal_plan(city: &str) -> Value {
    json!({
        "city": city,
        "start_date": "2025-06-01",
        "end_date": "2025-06-02",
        "days": [
            {
                "date": "2025-06-01",
                "day_index": 0,
                "description": "故宫与景山",
                "transportation": "地铁",
                "accommodation": "经济型酒店",
                "attractions": [{
                    "name": "故宫博物院",
                    "address": "景山前街4号",
                    "location": {"longitude": 116.397, "latitude": 39.918},
                    "visit_duration": 240,
                    "description": "明清皇宫",
                    "image_urls": [],
                    "ticket_price": 60
                }],
                "meals": [{"type": "dinner", "name": "烤鸭", "estimated_cost": 200}]
            },
            {
                "date": "2025-06-02",
                "day_index": 1,
                "description": "长城",
                "transportation": "大巴",
                "accommodation": "经济型酒店",
                "attractions": [],
                "meals": []
            }
        ],
        "weather_info": [{
            "date": "2025-06-01",
            "day_weather": "晴",
            "night_weather": "晴",
            "day_temp": 30,
            "night_temp": "20°C",
            "wind_direction": "北",
            "wind_power": "≤3级"
        }],
        "overall_suggestions": "注意防晒",
        "budget": {
            "total_attractions": 60,
            "total_hotels": 300,
            "total_meals": 200,
            "total_transportation": 40,
            "total": 600
        }
    })
}

fn sse_response(chunks: Vec<String>) -> Response {
    let stream = futures::stream::iter(chunks.into_iter().map(Ok::<_, Infallible>));
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(stream),
    )
        .into_response()
}

async fn plan(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    shared.lock().unwrap().plan_bodies.push(body.clone());

    match body["city"].as_str().unwrap_or_default() {
        "失败" => (StatusCode::INTERNAL_SERVER_ERROR, "planner exploded").into_response(),
        "乱码" => (StatusCode::OK, "not json").into_response(),
        city => Json(minimal_plan(city)).into_response(),
    }
}

async fn plan_stream(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    shared.lock().unwrap().stream_bodies.push(body.clone());
    let city = body["city"].as_str().unwrap_or_default().to_string();

    match city.as_str() {
        "报错" => sse_response(vec![
            "data: {\"step\":1,\"status\":\"searching\",\"progress\":15}\n\n".to_string(),
            "data: {\"error\":\"quota exceeded\",\"status\":\"failed\"}\n\n".to_string(),
            "data: {\"step\":3,\"status\":\"late\",\"progress\":55}\n\n".to_string(),
        ]),
        "无计划" => sse_response(vec![
            ": keep-alive\n\n".to_string(),
            "data: {\"step\":1,\"status\":\"searching\",\"progress\":15}\n\n".to_string(),
        ]),
        "无内容" => StatusCode::NO_CONTENT.into_response(),
        "重置" => StatusCode::RESET_CONTENT.into_response(),
        "空白" => sse_response(Vec::new()),
        "失败" => (StatusCode::BAD_GATEWAY, "upstream down").into_response(),
        _ => {
            let done = json!({
                "step": 2,
                "status": "done",
                "progress": 1,
                "data": minimal_plan(&city)
            })
            .to_string();
            let (head, tail) = done.split_at(12);
            sse_response(vec![
                format!("data: {{\"step\":1,\"status\":\"ok\",\"progress\":0.5}}\n\ndata: {head}"),
                format!("{tail}\n\n"),
            ])
        }
    }
}

async fn previews(State(shared): State<Shared>, RawQuery(query): RawQuery) -> Json<Value> {
    shared.lock().unwrap().preview_queries.push(query);
    Json(json!({
        "status": "success",
        "data": [{
            "id": "n1",
            "title": "东京三日游",
            "note_url": "https://www.xiaohongshu.com/explore/n1",
            "cover_image": "https://img.example.com/n1.jpg",
            "author": "旅行者",
            "liked_count": 42
        }],
        "search_url": "https://www.xiaohongshu.com/search_result?keyword=%E4%B8%9C%E4%BA%AC"
    }))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "rsshub": "http://localhost:1200"}))
}

/// Starts the fake backend on an ephemeral port and returns its `/api` base URL.
pub async fn spawn_backend() -> (String, Shared) {
    let shared: Shared = Arc::default();

    let app = Router::new()
        .route("/api/trip/plan", post(plan))
        .route("/api/trip/plan/stream", post(plan_stream))
        .route("/api/xhs/previews", get(previews))
        .route("/api/xhs/health", get(health))
        .with_state(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/api"), shared)
}
