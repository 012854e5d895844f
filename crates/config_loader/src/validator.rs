//! Configuration validation
//!
//! Rules:
//! - topic is not empty
//! - duplication >= 1 and the endpoint range fits below port 65535
//! - base_port != 0 (consecutive ports need a fixed base)
//! - 1 <= queue_capacity <= 65536
//! - framerate > 0, frame dimensions > 0
//! - rotation is one of 0 / 90 / 180 / 270

use contracts::{BroadcasterBlueprint, ContractError};

/// Upper bound for per-socket subscriber queues
pub const MAX_QUEUE_CAPACITY: usize = 65_536;

/// Validate a BroadcasterBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &BroadcasterBlueprint) -> Result<(), ContractError> {
    validate_topic(blueprint)?;
    validate_endpoints(blueprint)?;
    validate_queue_capacity(blueprint)?;
    validate_camera(blueprint)?;
    Ok(())
}

fn validate_topic(blueprint: &BroadcasterBlueprint) -> Result<(), ContractError> {
    if blueprint.publisher.topic.is_empty() {
        return Err(ContractError::config_validation(
            "publisher.topic",
            "topic cannot be empty",
        ));
    }
    Ok(())
}

/// Validate the endpoint range P..P+N
fn validate_endpoints(blueprint: &BroadcasterBlueprint) -> Result<(), ContractError> {
    let publisher = &blueprint.publisher;

    if publisher.duplication == 0 {
        return Err(ContractError::config_validation(
            "publisher.duplication",
            "duplication must be >= 1",
        ));
    }

    if publisher.base_port == 0 {
        return Err(ContractError::config_validation(
            "publisher.base_port",
            "base_port must be a fixed port, got 0",
        ));
    }

    let last_port = (publisher.base_port as usize).checked_add(publisher.duplication - 1);
    if last_port.map_or(true, |port| port > u16::MAX as usize) {
        return Err(ContractError::config_validation(
            "publisher.base_port / publisher.duplication",
            format!(
                "endpoint range of {} ports from {} exceeds port 65535",
                publisher.duplication, publisher.base_port
            ),
        ));
    }

    Ok(())
}

fn validate_queue_capacity(blueprint: &BroadcasterBlueprint) -> Result<(), ContractError> {
    let capacity = blueprint.publisher.queue_capacity;
    if capacity == 0 || capacity > MAX_QUEUE_CAPACITY {
        return Err(ContractError::config_validation(
            "publisher.queue_capacity",
            format!("queue_capacity must be in 1..={MAX_QUEUE_CAPACITY}, got {capacity}"),
        ));
    }
    Ok(())
}

fn validate_camera(blueprint: &BroadcasterBlueprint) -> Result<(), ContractError> {
    let camera = &blueprint.camera;

    if !(camera.framerate.is_finite() && camera.framerate > 0.0) {
        return Err(ContractError::config_validation(
            "camera.framerate",
            format!("framerate must be > 0, got {}", camera.framerate),
        ));
    }

    if camera.frame_width == 0 || camera.frame_height == 0 {
        return Err(ContractError::config_validation(
            "camera.frame_width / camera.frame_height",
            format!(
                "frame dimensions must be > 0, got {}x{}",
                camera.frame_width, camera.frame_height
            ),
        ));
    }

    if !matches!(camera.rotation, 0 | 90 | 180 | 270) {
        return Err(ContractError::config_validation(
            "camera.rotation",
            format!("rotation must be 0, 90, 180 or 270, got {}", camera.rotation),
        ));
    }

    Ok(())
}
