use serde_json::{Map, Value};
use shared::{
    domain::{Truck, TruckId},
    error::{ApiError, ErrorCode},
};
use tracing::{error, info};
use uuid::Uuid;

use crate::fleet::{Fleet, FleetError, Upsert};

pub fn trucks_route() -> &'static str {
    "/trucks"
}

pub fn truck_route() -> &'static str {
    "/trucks/:truck_id"
}

pub fn stream_route() -> &'static str {
    "/ws/:endpoint"
}

pub async fn list_trucks(fleet: &Fleet) -> Vec<Truck> {
    fleet.list().await
}

/// Adds a truck from a JSON object, generating an id when the body has none.
pub async fn add_truck(fleet: &Fleet, body: Map<String, Value>) -> Result<Truck, ApiError> {
    let (id, attributes) = split_id(body)?;
    let id = id.unwrap_or_else(|| TruckId(Uuid::new_v4().to_string()));
    let truck = Truck { id, attributes };
    fleet.add(truck.clone()).await.map_err(fleet_error)?;
    info!(truck_id = %truck.id, "truck added");
    Ok(truck)
}

pub async fn put_truck(
    fleet: &Fleet,
    truck_id: TruckId,
    body: Map<String, Value>,
) -> Result<(Truck, Upsert), ApiError> {
    if truck_id.as_str().trim().is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "truck id must not be empty"));
    }
    let (body_id, attributes) = split_id(body)?;
    if body_id.as_ref().is_some_and(|body_id| *body_id != truck_id) {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!("body id does not match truck {truck_id}"),
        ));
    }

    let truck = Truck {
        id: truck_id,
        attributes,
    };
    let outcome = fleet.upsert(truck.clone()).await.map_err(fleet_error)?;
    info!(truck_id = %truck.id, ?outcome, "truck stored");
    Ok((truck, outcome))
}

pub async fn remove_truck(fleet: &Fleet, truck_id: &TruckId) -> Result<Truck, ApiError> {
    let removed = fleet.remove(truck_id).await.map_err(fleet_error)?;
    let Some(truck) = removed else {
        return Err(ApiError::new(
            ErrorCode::NotFound,
            format!("unknown truck {truck_id}"),
        ));
    };
    info!(%truck_id, "truck removed");
    Ok(truck)
}

fn split_id(mut body: Map<String, Value>) -> Result<(Option<TruckId>, Map<String, Value>), ApiError> {
    let id = match body.remove("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) if !id.trim().is_empty() => Some(TruckId(id)),
        Some(_) => {
            return Err(ApiError::new(
                ErrorCode::Validation,
                "id must be a non-empty string",
            ))
        }
    };
    Ok((id, body))
}

fn fleet_error(err: FleetError) -> ApiError {
    match err {
        FleetError::DuplicateId(id) => {
            ApiError::new(ErrorCode::Conflict, format!("truck {id} already exists"))
        }
        FleetError::Encode(source) => {
            error!(error = %source, "failed to publish truck snapshot");
            ApiError::new(ErrorCode::Internal, "internal error")
        }
    }
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
