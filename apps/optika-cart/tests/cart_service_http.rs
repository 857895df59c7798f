//! The reqwest backend against a real HTTP endpoint: an in-process axum
//! stand-in for the cart service.

use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use optika_cart::api::{ApiConfig, ApiError, CartApi};
use optika_cart::cart::CartStore;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct ServiceState {
    quantities: Arc<Mutex<HashMap<String, u32>>>,
}

const STOCK_PER_ITEM: u32 = 25;

async fn get_cart(State(state): State<ServiceState>) -> Json<Value> {
    let mut entries: Vec<(String, u32)> = state
        .quantities
        .lock()
        .unwrap()
        .iter()
        .map(|(id, qty)| (id.clone(), *qty))
        .collect();
    entries.sort();
    let items: Vec<Value> = entries
        .iter()
        .map(|(id, qty)| {
            json!({
                "cart_item_id": id,
                "variant_id": format!("variant-{id}"),
                "product_slug": format!("frame-{id}"),
                "quantity": qty,
                "available_inventory": STOCK_PER_ITEM,
                "status": "available",
            })
        })
        .collect();
    Json(json!({ "success": true, "items": items }))
}

async fn set_quantity(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let Some(quantity) = body["quantity"].as_u64() else {
        return Json(json!({ "success": false, "message": "missing quantity" }));
    };
    if quantity as u32 > STOCK_PER_ITEM {
        return Json(json!({ "success": false, "message": "insufficient stock" }));
    }
    state
        .quantities
        .lock()
        .unwrap()
        .insert(id, quantity as u32);
    Json(json!({ "success": true }))
}

async fn spawn_service(initial: &[(&str, u32)]) -> String {
    let state = ServiceState::default();
    {
        let mut quantities = state.quantities.lock().unwrap();
        for (id, qty) in initial {
            quantities.insert(id.to_string(), *qty);
        }
    }
    let app = Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/items/:id", patch(set_quantity))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn fetch_and_commit_round_trip() {
    let base = spawn_service(&[("a", 2)]).await;
    let api = CartApi::new(ApiConfig::new(&base).unwrap(), Arc::new(CartStore::new())).unwrap();

    let lines = api.fetch_cart().await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 2);
    assert_eq!(lines[0].available_inventory, Some(STOCK_PER_ITEM));

    api.set_item_quantity("a", 7).await.unwrap();
    // Refresh-on-success: the store now reflects the committed quantity.
    assert_eq!(api.store().lines()[0].quantity, 7);
}

#[tokio::test]
async fn service_rejection_surfaces_as_server_error() {
    let base = spawn_service(&[("a", 2)]).await;
    let api = CartApi::new(ApiConfig::new(&base).unwrap(), Arc::new(CartStore::new())).unwrap();
    api.fetch_cart().await.unwrap();

    let err = api.set_item_quantity("a", STOCK_PER_ITEM + 1).await.unwrap_err();
    assert!(matches!(err, ApiError::Server(message) if message.contains("insufficient stock")));

    // The confirmed state is untouched by the rejected commit.
    assert_eq!(api.store().lines()[0].quantity, 2);
}

#[tokio::test]
async fn missing_endpoint_maps_to_http_status() {
    let base = spawn_service(&[]).await;
    let api = CartApi::new(
        ApiConfig::new(format!("{base}/nowhere/")).unwrap(),
        Arc::new(CartStore::new()),
    )
    .unwrap();

    let err = api.fetch_cart().await.unwrap_err();
    assert!(matches!(err, ApiError::HttpStatus(status) if status.as_u16() == 404));
}
