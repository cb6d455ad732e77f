use save_proto::{Grid, ShapeError, Snapshot, WeatherInfo};

use crate::{
    grid::GridError,
    world::{GridField, WorldDocument, WorldError},
};

/// The five per-tile arrays in map orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedGrids {
    pub water_depth: Grid,
    pub contamination: Grid,
    pub moisture: Grid,
    pub soil_contamination: Grid,
    /// Absent when the save predates `WaterEvaporationMap`.
    pub evaporation: Option<Grid>,
}

/// Water volume not attributable to contamination: `Σ (d - d * c)`.
///
/// Inputs are not clamped; contamination above 1 yields negative clean water.
pub fn clean_water(depth: &Grid, contamination: &Grid) -> Result<f64, ShapeError> {
    depth.ensure_same_shape(contamination)?;
    Ok(depth
        .values()
        .iter()
        .zip(contamination.values())
        .map(|(d, c)| d - d * c)
        .sum())
}

pub fn total_clean_water(world: &WorldDocument) -> Result<f64, WorldError> {
    let size = world.map_size()?;
    let depth = world.grid_with_size(GridField::WaterDepth, size)?;
    let contamination = world.grid_with_size(GridField::Contamination, size)?;
    clean_water_of(&depth, &contamination)
}

pub fn weather_summary(world: &WorldDocument) -> Result<WeatherInfo, WorldError> {
    let hazardous = world.hazardous_weather()?;
    let service = world.weather_service()?;
    Ok(WeatherInfo {
        hazardous_weather_duration: hazardous.hazardous_weather_duration,
        is_drought: hazardous.is_drought,
        cycle: service.cycle,
        cycle_day: service.cycle_day,
        temperate_weather_duration: service.temperate_weather_duration,
    })
}

pub fn tracked_grids(world: &WorldDocument) -> Result<TrackedGrids, WorldError> {
    let size = world.map_size()?;
    let evaporation_singleton = GridField::EvaporationModifier.locator().singleton;
    let evaporation = if world.has_singleton(evaporation_singleton) {
        Some(world.grid_with_size(GridField::EvaporationModifier, size)?)
    } else {
        None
    };

    Ok(TrackedGrids {
        water_depth: world.grid_with_size(GridField::WaterDepth, size)?,
        contamination: world.grid_with_size(GridField::Contamination, size)?,
        moisture: world.grid_with_size(GridField::SoilMoisture, size)?,
        soil_contamination: world.grid_with_size(GridField::SoilContamination, size)?,
        evaporation,
    })
}

/// Assemble the history record for one save.
pub fn capture_snapshot(world: &WorldDocument) -> Result<Snapshot, WorldError> {
    let timestamp = world
        .timestamp()
        .ok_or_else(|| WorldError::MissingField("Timestamp".to_string()))?;
    let size = world.map_size()?;
    let grids = tracked_grids(world)?;
    let clean_water_total = clean_water_of(&grids.water_depth, &grids.contamination)?;
    let weather_info = weather_summary(world)?;

    Ok(Snapshot {
        timestamp,
        clean_water_total,
        water_levels_matrix: grids.water_depth,
        contamination_matrix: grids.contamination,
        moisture_levels_matrix: grids.moisture,
        soil_contamination_matrix: grids.soil_contamination,
        evaporation_modifiers_matrix: grids.evaporation,
        weather_info,
        map_width: size.width,
        map_height: size.height,
    })
}

fn clean_water_of(depth: &Grid, contamination: &Grid) -> Result<f64, WorldError> {
    clean_water(depth, contamination).map_err(|source| WorldError::Grid {
        path: format!(
            "{} x {}",
            GridField::WaterDepth.locator(),
            GridField::Contamination.locator()
        ),
        source: GridError::Shape(source),
    })
}
