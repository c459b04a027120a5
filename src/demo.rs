//! Demo travel-planning wiring for the CLI.
//!
//! Domain filler only: the catalog, participants, and steps here are
//! arbitrary bodies exercising the orchestration core in both execution
//! models. All domain data is passed in at construction.

use std::sync::Arc;

use serde_json::json;

use weft_core::envelope::{Envelope, Role};
use weft_core::error::Result;
use weft_core::participant::HandlerParticipant;
use weft_engine::graph::{Graph, StepUpdate};
use weft_engine::router::Router;

/// Static place catalog standing in for a real data source.
pub struct Catalog {
    pub cafes: Vec<serde_json::Value>,
    pub exhibitions: Vec<serde_json::Value>,
    pub restaurants: Vec<serde_json::Value>,
}

impl Catalog {
    pub fn sample() -> Arc<Self> {
        Arc::new(Self {
            cafes: vec![
                json!({ "name": "Momos Coffee", "area": "Jeonpo" }),
                json!({ "name": "Terarosa", "area": "Haeundae" }),
            ],
            exhibitions: vec![
                json!({ "name": "F1963", "area": "Suyeong" }),
                json!({ "name": "Busan Museum of Art", "area": "Haeundae" }),
            ],
            restaurants: vec![json!({ "name": "Miryang Sundae Soup", "area": "Bujeon" })],
        })
    }

    fn all(&self) -> Vec<serde_json::Value> {
        let mut places = self.cafes.clone();
        places.extend(self.exhibitions.clone());
        places.extend(self.restaurants.clone());
        places
    }
}

/// Coordinator + two experts exchanging envelopes through a router.
pub fn travel_router(catalog: Arc<Catalog>) -> Router {
    let coordinator = HandlerParticipant::new("Coordinator")
        .on_role(Role::User, |env| {
            Ok(Some(Envelope::direct(
                "Coordinator",
                "PlaceExpert",
                json!({
                    "action": "request_places",
                    "request": env.render_text(),
                }),
            )))
        })
        .on_sender("PlaceExpert", |env| {
            Ok(Some(Envelope::direct(
                "Coordinator",
                "ScheduleExpert",
                json!({
                    "action": "create_schedule",
                    "places": env.payload.field("places").cloned().unwrap_or_default(),
                }),
            )))
        })
        .on_sender("ScheduleExpert", |env| {
            Ok(Some(Envelope::broadcast(
                "Coordinator",
                json!({
                    "action": "final_result",
                    "schedule": env.payload.field("schedule").cloned().unwrap_or_default(),
                }),
            )))
        });

    let place_catalog = catalog.clone();
    let place_expert = HandlerParticipant::new("PlaceExpert").on_action("request_places", move |_| {
        Ok(Some(Envelope::direct(
            "PlaceExpert",
            "Coordinator",
            json!({
                "action": "places_response",
                "places": place_catalog.all(),
            }),
        )))
    });

    let schedule_expert = HandlerParticipant::new("ScheduleExpert").on_action(
        "create_schedule",
        move |env| {
            let places = env
                .payload
                .field("places")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();
            Ok(Some(Envelope::direct(
                "ScheduleExpert",
                "Coordinator",
                json!({
                    "action": "schedule_response",
                    "schedule": build_schedule(&places),
                }),
            )))
        },
    );

    let mut router = Router::new();
    router.register(Box::new(coordinator));
    router.register(Box::new(place_expert));
    router.register(Box::new(schedule_expert));
    router
}

/// The same computation as named steps threaded by a context.
pub fn travel_graph(catalog: Arc<Catalog>) -> Result<Graph> {
    let minimize_catalog = catalog.clone();
    let variety_catalog = catalog.clone();

    Graph::builder()
        .step("parse_request", |ctx| {
            let raw = ctx.get_str("raw_input").unwrap_or_default().to_string();
            let minimize = raw.contains("minimize");
            Ok(StepUpdate::new()
                .set_str("duration", "2 days")
                .set(
                    "constraints",
                    if minimize {
                        json!(["solo dining", "minimize travel"])
                    } else {
                        json!(["solo dining"])
                    },
                )
                .trace(format!("[parse_request] parsed: {}", raw)))
        })
        .step("analyze_preferences", |ctx| {
            let minimize = ctx
                .get_list("constraints")
                .iter()
                .any(|c| c.as_str() == Some("minimize travel"));
            let priority = if minimize {
                "minimize_travel"
            } else {
                "maximize_variety"
            };
            Ok(StepUpdate::new()
                .set_str("priority", priority)
                .trace(format!("[analyze_preferences] priority: {}", priority)))
        })
        .step("select_places_minimize", move |_| {
            // Bias toward one area to keep travel short.
            let mut selected = vec![minimize_catalog.cafes[0].clone()];
            selected.extend(
                minimize_catalog
                    .exhibitions
                    .iter()
                    .filter(|p| p["area"] == minimize_catalog.cafes[0]["area"])
                    .cloned(),
            );
            selected.push(minimize_catalog.restaurants[0].clone());
            let count = selected.len();
            Ok(StepUpdate::new()
                .set("selected_places", json!(selected))
                .trace(format!(
                    "[select_places_minimize] {} places, travel minimized",
                    count
                )))
        })
        .step("select_places_variety", move |_| {
            let selected = vec![
                variety_catalog.cafes[0].clone(),
                variety_catalog.exhibitions[0].clone(),
                variety_catalog.restaurants[0].clone(),
            ];
            Ok(StepUpdate::new()
                .set("selected_places", json!(selected))
                .trace("[select_places_variety] one of each kind"))
        })
        .conditional(
            "analyze_preferences",
            |ctx| {
                if ctx.get_str("priority") == Some("minimize_travel") {
                    "minimize".to_string()
                } else {
                    "variety".to_string()
                }
            },
            [
                ("minimize", "select_places_minimize"),
                ("variety", "select_places_variety"),
            ],
        )
        .step("generate_schedule", |ctx| {
            let places: Vec<serde_json::Value> = ctx.get_list("selected_places").to_vec();
            Ok(StepUpdate::new()
                .set("schedule", build_schedule(&places))
                .trace(format!("[generate_schedule] {} places scheduled", places.len())))
        })
        .step("format_output", |ctx| {
            let schedule = ctx.get("schedule").cloned().unwrap_or_default();
            let mut lines = vec!["Travel itinerary".to_string()];
            for day in ["day1", "day2"] {
                if let Some(items) = schedule.get(day).and_then(|v| v.as_array()) {
                    lines.push(format!("{}:", day));
                    for item in items {
                        lines.push(format!(
                            "  {} | {} ({})",
                            item["time"].as_str().unwrap_or("--:--"),
                            item["name"].as_str().unwrap_or("?"),
                            item["area"].as_str().unwrap_or("?"),
                        ));
                    }
                }
            }
            Ok(StepUpdate::new()
                .set_str("final_output", lines.join("\n"))
                .trace("[format_output] itinerary rendered"))
        })
        .edge("parse_request", "analyze_preferences")
        .edge("select_places_minimize", "generate_schedule")
        .edge("select_places_variety", "generate_schedule")
        .edge("generate_schedule", "format_output")
        .entry("parse_request")
        .build()
}

/// Spread places over two days with fixed visit times.
fn build_schedule(places: &[serde_json::Value]) -> serde_json::Value {
    let times = ["10:00", "14:00", "18:00"];
    let mut day1 = Vec::new();
    let mut day2 = Vec::new();
    for (i, place) in places.iter().enumerate() {
        let item = json!({
            "time": times[i % times.len()],
            "name": place["name"],
            "area": place["area"],
        });
        if i < times.len() {
            day1.push(item);
        } else {
            day2.push(item);
        }
    }
    json!({ "day1": day1, "day2": day2 })
}
