//! End-to-end runs of a small travel-planning pipeline in both execution
//! models.

use serde_json::json;

use weft_core::envelope::{Envelope, Role};
use weft_core::participant::HandlerParticipant;
use weft_engine::graph::{Graph, StepUpdate};
use weft_engine::orchestrator::{BusOrchestrator, GraphOrchestrator};
use weft_engine::router::Router;

fn travel_router() -> Router {
    let coordinator = HandlerParticipant::new("Coordinator")
        .on_role(Role::User, |env| {
            Ok(Some(Envelope::direct(
                "Coordinator",
                "PlaceExpert",
                json!({ "action": "request_places", "request": env.render_text() }),
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

    let place_expert = HandlerParticipant::new("PlaceExpert").on_action("request_places", |_| {
        Ok(Some(Envelope::direct(
            "PlaceExpert",
            "Coordinator",
            json!({
                "action": "places_response",
                "places": [
                    { "name": "Momos Coffee", "area": "Jeonpo" },
                    { "name": "F1963", "area": "Suyeong" },
                ],
            }),
        )))
    });

    let schedule_expert =
        HandlerParticipant::new("ScheduleExpert").on_action("create_schedule", |env| {
            let places = env
                .payload
                .field("places")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();
            let items: Vec<serde_json::Value> = places
                .iter()
                .enumerate()
                .map(|(i, p)| json!({ "order": i, "name": p["name"] }))
                .collect();
            Ok(Some(Envelope::direct(
                "ScheduleExpert",
                "Coordinator",
                json!({ "action": "schedule_response", "schedule": { "day1": items } }),
            )))
        });

    let mut router = Router::new();
    router.register(Box::new(coordinator));
    router.register(Box::new(place_expert));
    router.register(Box::new(schedule_expert));
    router
}

#[test]
fn bus_pipeline_produces_schedule_artifact() {
    let mut orchestrator = BusOrchestrator::new(travel_router(), "Coordinator");
    let outcome = orchestrator.run("two quiet days, minimize travel").unwrap();

    assert!(outcome.is_complete());
    let artifact = outcome.artifact().unwrap();
    assert_eq!(artifact["action"], "final_result");
    assert_eq!(artifact["schedule"]["day1"][0]["name"], "Momos Coffee");
}

#[test]
fn bus_pipeline_log_contains_every_history() {
    let mut orchestrator = BusOrchestrator::new(travel_router(), "Coordinator");
    orchestrator.run("trip").unwrap();

    let router = orchestrator.router();
    for identity in ["Coordinator", "PlaceExpert", "ScheduleExpert"] {
        let history = router.participant(identity).unwrap().history();
        assert!(!history.is_empty(), "{} received nothing", identity);
        let mut log_iter = router.log().iter();
        for received in history {
            assert!(
                log_iter.any(|logged| logged.id == received.id),
                "{}'s history is not an ordered subsequence of the log",
                identity
            );
        }
    }
}

#[test]
fn bus_pipeline_rerun_is_deterministic() {
    let run = |input: &str| {
        let mut orchestrator = BusOrchestrator::new(travel_router(), "Coordinator");
        let outcome = orchestrator.run(input).unwrap();
        let actions: Vec<String> = orchestrator
            .router()
            .log()
            .iter()
            .map(|e| e.action().unwrap_or("-").to_string())
            .collect();
        (outcome.artifact().cloned(), actions)
    };

    let (first_artifact, first_actions) = run("same input");
    let (second_artifact, second_actions) = run("same input");
    assert_eq!(first_artifact, second_artifact);
    assert_eq!(first_actions, second_actions);
}

fn travel_graph() -> Graph {
    Graph::builder()
        .step("parse_request", |ctx| {
            let raw = ctx.get_str("raw_input").unwrap_or_default();
            let minimize = raw.contains("minimize");
            Ok(StepUpdate::new()
                .set(
                    "constraints",
                    if minimize {
                        json!(["minimize travel"])
                    } else {
                        json!([])
                    },
                )
                .trace("[parse_request] parsed"))
        })
        .step("analyze_preferences", |ctx| {
            let minimize = ctx
                .get_list("constraints")
                .iter()
                .any(|c| c.as_str() == Some("minimize travel"));
            Ok(StepUpdate::new()
                .set_str(
                    "priority",
                    if minimize {
                        "minimize_travel"
                    } else {
                        "maximize_variety"
                    },
                )
                .trace("[analyze_preferences] analyzed"))
        })
        .step("select_places_minimize", |_| {
            Ok(StepUpdate::new()
                .set("selected_places", json!([{ "name": "Momos Coffee" }]))
                .trace("[select_places_minimize] selected"))
        })
        .step("select_places_variety", |_| {
            Ok(StepUpdate::new()
                .set(
                    "selected_places",
                    json!([{ "name": "Momos Coffee" }, { "name": "F1963" }]),
                )
                .trace("[select_places_variety] selected"))
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
        .step("format_output", |ctx| {
            let count = ctx.get_list("selected_places").len();
            Ok(StepUpdate::new()
                .set_str("final_output", format!("itinerary with {} places", count))
                .trace("[format_output] rendered"))
        })
        .edge("parse_request", "analyze_preferences")
        .edge("select_places_minimize", "format_output")
        .edge("select_places_variety", "format_output")
        .entry("parse_request")
        .build()
        .unwrap()
}

#[test]
fn graph_pipeline_branches_on_priority() {
    let orchestrator = GraphOrchestrator::new(travel_graph());

    let outcome = orchestrator.run("two days, minimize travel").unwrap();
    assert!(outcome.is_complete());
    assert_eq!(
        outcome.artifact().unwrap(),
        &json!("itinerary with 1 places")
    );
    assert!(outcome
        .trace()
        .contains(&"[select_places_minimize] selected".to_string()));

    let outcome = orchestrator.run("two days, lots of variety").unwrap();
    assert_eq!(
        outcome.artifact().unwrap(),
        &json!("itinerary with 2 places")
    );
    assert!(outcome
        .trace()
        .contains(&"[select_places_variety] selected".to_string()));
}

#[test]
fn graph_pipeline_trace_preserves_step_order() {
    let orchestrator = GraphOrchestrator::new(travel_graph());
    let outcome = orchestrator.run("minimize travel").unwrap();

    assert_eq!(
        outcome.trace(),
        [
            "[parse_request] parsed",
            "[analyze_preferences] analyzed",
            "[select_places_minimize] selected",
            "[format_output] rendered",
        ]
    );
}
