//! End-to-end enrichment of biosample records through scripted providers.

use serde_json::json;

use reconciler::{
    classify_texture, DepthInterval, EnrichError, Enricher, FailureReason, ImprovementCategory,
    Marine, MarineQuality, Observation, Reconciler, SchemaMapper, Soil, SoilField, SoilQuality,
    TargetSchema, TextureClass, Weather, WeatherQuality,
};
use test_utils::{
    assert_approx_eq, bathymetry_observation, points, record_without_coordinates,
    record_without_date, shape_a_record, shape_b_record, soil_precision, sst_observation,
    temperature_observation, Script, ScriptedProvider,
};

fn marine_enricher() -> Enricher<Marine> {
    Enricher::new(Reconciler::new(vec![
        ScriptedProvider::<Marine>::returning(
            "noaa_oisst",
            vec![sst_observation(MarineQuality::SatelliteL4, "noaa_oisst")],
        )
        .into_arc(),
        ScriptedProvider::<Marine>::returning(
            "gebco",
            vec![bathymetry_observation(MarineQuality::StaticDataset, "gebco")],
        )
        .into_arc(),
    ]))
}

fn empty_weather_enricher() -> Enricher<Weather> {
    Enricher::new(Reconciler::new(vec![
        ScriptedProvider::<Weather>::unavailable("open_meteo").into_arc(),
        ScriptedProvider::<Weather>::no_data("meteostat").into_arc(),
    ]))
}

// ============================================================================
// Single record
// ============================================================================

#[tokio::test]
async fn test_scenario_a_nmdc_mapping() {
    let (lat, lon) = points::GREAT_LAKES;
    let record = shape_a_record(lat, lon, "2018-07-12");

    let outcome = marine_enricher().enrich(&record, "nmdc").await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.error, None);
    let mapping = &outcome.schema_mapping;
    assert_eq!(mapping["temp"]["has_numeric_value"], 22.1);
    assert_eq!(mapping["tot_depth_water_col"]["has_numeric_value"], 1250.5);
    assert_eq!(mapping["elev"]["has_numeric_value"], -1250.5);

    let merged = outcome.merged_result.unwrap();
    assert_eq!(merged.overall_quality, MarineQuality::SatelliteL4);

    let metrics = outcome.coverage_metrics.unwrap();
    assert_eq!(metrics.enriched_count, 2);
    assert_eq!(metrics.total_possible_fields, 9);
    assert_eq!(metrics.average_quality_score, Some(92.5));
    assert_eq!(metrics.tier, "satellite_l4");
}

#[tokio::test]
async fn test_shape_b_gold_mapping() {
    let (lat, lon) = points::GREAT_LAKES;
    let record = shape_b_record(lat, lon, "2018-07-12");

    let outcome = marine_enricher().enrich(&record, "GOLD").await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.schema_mapping["sampleCollectionTemperature"], "22.1 Celsius");
    assert_eq!(outcome.schema_mapping["depthInMeters"], 1250.5);
    assert_eq!(outcome.schema_mapping["elevationInMeters"], -1250.5);
}

#[tokio::test]
async fn test_scenario_b_missing_coordinates() {
    let outcome = marine_enricher()
        .enrich(&record_without_coordinates(), "nmdc")
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.error, Some(FailureReason::NoCoordinates));
    assert!(outcome.merged_result.is_none());

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["error"], "no_coordinates");
}

#[tokio::test]
async fn test_missing_collection_date() {
    let outcome = marine_enricher().enrich(&record_without_date(), "nmdc").await.unwrap();
    assert_eq!(outcome.error, Some(FailureReason::NoCollectionDate));
}

#[tokio::test]
async fn test_out_of_range_coordinates() {
    let record = shape_b_record(95.0, 10.0, "2018-07-12");
    let outcome = marine_enricher().enrich(&record, "nmdc").await.unwrap();
    assert_eq!(outcome.error, Some(FailureReason::InvalidCoordinates));
}

#[tokio::test]
async fn test_unsupported_schema_is_an_error() {
    let (lat, lon) = points::GREAT_LAKES;
    let record = shape_a_record(lat, lon, "2018-07-12");

    let err = marine_enricher().enrich(&record, "mixs").await.unwrap_err();
    assert!(matches!(err, EnrichError::UnsupportedSchema(_)));
    assert_eq!(err.code(), "unsupported_schema");
}

#[tokio::test]
async fn test_scenario_d_no_data_available() {
    let (lat, lon) = points::GREAT_LAKES;
    let record = shape_a_record(lat, lon, "2018-07-12");

    let outcome = empty_weather_enricher().enrich(&record, "nmdc").await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.error, Some(FailureReason::NoDataAvailable));
    assert!(outcome.schema_mapping.is_empty());
    let metrics = outcome.coverage_metrics.unwrap();
    assert_eq!(metrics.enriched_count, 0);
    assert_eq!(metrics.average_quality_score, None);
    assert_eq!(
        outcome.merged_result.unwrap().overall_quality,
        WeatherQuality::NoData
    );
}

// ============================================================================
// Sample depth
// ============================================================================

fn layered_soil_enricher() -> Enricher<Soil> {
    let ph = Observation::new(6.5, "pH", soil_precision(SoilQuality::GriddedPrediction, "soilgrids"));
    Enricher::new(Reconciler::new(vec![ScriptedProvider::<Soil>::new(
        "soilgrids",
        Script::AtRequestedDepth(vec![(SoilField::PhH2o, ph)]),
    )
    .into_arc()]))
}

#[tokio::test]
async fn test_record_depth_selects_soil_layer() {
    let (lat, lon) = points::IOWA;
    let mut record = shape_a_record(lat, lon, "2018-07-12");
    record["depth"] = json!({"has_numeric_value": 0.1, "has_unit": "m"});

    let outcome = layered_soil_enricher().enrich(&record, "nmdc").await.unwrap();

    assert!(outcome.success);
    let merged = outcome.merged_result.unwrap();
    assert_eq!(merged.layers.len(), 1);
    assert_eq!(merged.layers[0].depth, Some(DepthInterval::Cm5To15));
    assert!(merged
        .observation_at(Some(DepthInterval::Cm5To15), SoilField::PhH2o)
        .is_some());
}

#[tokio::test]
async fn test_record_without_depth_uses_surface() {
    let (lat, lon) = points::IOWA;
    let record = shape_b_record(lat, lon, "2018-07-12");

    let outcome = layered_soil_enricher().enrich(&record, "gold").await.unwrap();

    let merged = outcome.merged_result.unwrap();
    assert_eq!(merged.layers[0].depth, Some(DepthInterval::Cm0To5));
}

// ============================================================================
// Batch
// ============================================================================

#[tokio::test]
async fn test_batch_isolates_failures() {
    let (lat, lon) = points::GREAT_LAKES;
    let records = vec![
        shape_a_record(lat, lon, "2018-07-12"),
        record_without_coordinates(),
        shape_b_record(lat, lon, "2018-07-12"),
        json!({"latitude": lat, "longitude": lon, "dateCollected": "sometime"}),
    ];

    let batch = marine_enricher().enrich_batch(&records, "nmdc").await.unwrap();

    assert_eq!(batch.total(), 4);
    assert_eq!(batch.successful, 2);
    assert_eq!(batch.failed, 2);
    assert_eq!(batch.outcomes[1].error, Some(FailureReason::NoCoordinates));
    assert_eq!(batch.outcomes[3].error, Some(FailureReason::NoCollectionDate));
}

#[tokio::test]
async fn test_batch_rejects_unsupported_schema_up_front() {
    let result = marine_enricher().enrich_batch(&[], "ncbi").await;
    assert!(matches!(result, Err(EnrichError::UnsupportedSchema(_))));
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_round_trip_never_invents_fields() {
    let (lat, lon) = points::GREAT_LAKES;
    let record = shape_a_record(lat, lon, "2018-07-12");
    let outcome = marine_enricher().enrich(&record, "nmdc").await.unwrap();
    let merged = outcome.merged_result.unwrap();

    for schema in [TargetSchema::Nmdc, TargetSchema::Gold] {
        let mapping = Marine::map_result(&merged, schema);
        let recovered = Marine::unmap(&mapping, schema);
        assert!(recovered.is_subset(&merged.filled_fields()));
    }
}

#[tokio::test]
async fn test_coverage_percentage_bounds() {
    let (lat, lon) = points::GREAT_LAKES;
    let record = shape_a_record(lat, lon, "2018-07-12");

    for enricher in [marine_enricher(), Enricher::new(Reconciler::new(Vec::new()))] {
        let outcome = enricher.enrich(&record, "nmdc").await.unwrap();
        let metrics = outcome.coverage_metrics.unwrap();
        assert!((0.0..=100.0).contains(&metrics.enrichment_percentage));
        assert_eq!(
            metrics.enrichment_percentage,
            metrics.enriched_count as f64 / metrics.total_possible_fields as f64 * 100.0
        );
    }
}

#[test]
fn test_scenario_c_texture() {
    assert_eq!(classify_texture(45.0, 40.0, 15.0).unwrap(), TextureClass::Loam);
    assert_eq!(classify_texture(20.0, 20.0, 60.0).unwrap(), TextureClass::Clay);
    assert!(matches!(
        classify_texture(40.0, 30.0, 20.0),
        Err(EnrichError::InvalidTexture(_))
    ));
}

// ============================================================================
// Collection analysis
// ============================================================================

#[tokio::test]
async fn test_analyze_collection() {
    let (lat, lon) = points::GREAT_LAKES;
    let mut already_measured = shape_a_record(lat, lon, "2018-07-12");
    already_measured["temp"] = json!({"has_numeric_value": 19.0, "has_unit": "Celsius"});

    let records = vec![
        already_measured,
        shape_a_record(lat, lon, "2018-07-13"),
        shape_b_record(lat, lon, "2018-07-14"),
        record_without_coordinates(),
    ];

    let enricher = Enricher::<Weather>::new(Reconciler::new(vec![ScriptedProvider::<Weather>::returning(
        "open_meteo",
        vec![temperature_observation(WeatherQuality::DaySpecificComplete, "open_meteo", 21.0)],
    )
    .into_arc()]));

    let analysis = enricher.analyze_collection(&records, "test_collection", "nmdc").await.unwrap();

    assert_eq!(analysis.total_records, 4);
    assert_eq!(analysis.domain, "weather");

    let temp = analysis.field("temperature").unwrap();
    assert_approx_eq!(temp.before, 25.0, 1e-9);
    assert_approx_eq!(temp.after, 75.0, 1e-9);
    assert_eq!(temp.category, ImprovementCategory::Major);
    assert_eq!(temp.relative, Some(200.0));

    let pressure = analysis.field("pressure").unwrap();
    assert_eq!(pressure.category, ImprovementCategory::None);
    assert_eq!(pressure.relative, None);

    assert_eq!(analysis.summary.successful, 3);
    assert_eq!(analysis.summary.failed, 1);
    assert_eq!(analysis.summary.failure_reasons["no_coordinates"], 1);
    assert_eq!(analysis.summary.tier_distribution["day_specific_complete"], 3);
}
