mod common;

use std::sync::Arc;

use arrow::{
    array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, UInt64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use fink_filters::{
    batch::columns,
    builtin::{GVOM_FAST_TRANSIENTS, SSO_ZTF_CANDIDATES, YSO_SPICY_CANDIDATES},
    classification::labels,
    filter::{CompositeFilter, FilterBuilder},
    BatchAdapter, ColumnBatch, CompositionCycleError, FilterConfig, FilterError, FilterRegistry,
    RegistryError, SchemaError,
};

fn batch(id: &str, columns: Vec<(&str, ArrayRef)>) -> ColumnBatch {
    ColumnBatch::try_new(id, columns).expect("aligned columns")
}

fn floats(values: &[f64]) -> ArrayRef {
    Arc::new(Float64Array::from(values.to_vec()))
}

fn ints(values: &[i64]) -> ArrayRef {
    Arc::new(Int64Array::from(values.to_vec()))
}

#[test]
fn scenario_sso_candidates() {
    let registry = FilterRegistry::with_builtins().expect("builtins");
    let alerts = batch("s1", vec![(columns::ROID, ints(&[0, 3, 1, 3]))]);
    let mask = registry.evaluate(SSO_ZTF_CANDIDATES, &alerts).expect("mask");
    assert_eq!(mask.to_vec(), vec![false, true, false, true]);
}

#[test]
fn scenario_catalog_match() {
    let registry = FilterRegistry::with_builtins().expect("builtins");
    let alerts = batch("s2", vec![(columns::SPICY_ID, ints(&[-1, -1, 5, 0]))]);
    let mask = registry.evaluate(YSO_SPICY_CANDIDATES, &alerts).expect("mask");
    assert_eq!(mask.to_vec(), vec![false, false, true, true]);
}

#[test]
fn catalog_match_keeps_every_id_but_minus_one() {
    let registry = FilterRegistry::with_builtins().expect("builtins");
    let alerts = batch(
        "spicy-float",
        vec![(columns::SPICY_ID, floats(&[-1.5, -1.0, 1e20, -0.5]))],
    );
    let mask = registry.evaluate(YSO_SPICY_CANDIDATES, &alerts).expect("mask");
    assert_eq!(mask.to_vec(), vec![true, false, true, true]);

    let unsigned: ArrayRef = Arc::new(UInt64Array::from(vec![u64::MAX, 5]));
    let alerts = batch("spicy-u64", vec![(columns::SPICY_ID, unsigned)]);
    let mask = registry.evaluate(YSO_SPICY_CANDIDATES, &alerts).expect("mask");
    assert_eq!(mask.to_vec(), vec![true, true]);
}

#[test]
fn scenario_recency_window() {
    let mut registry = FilterRegistry::new();
    registry
        .register(
            CompositeFilter::new("young", FilterBuilder::leaf().recency().build())
                .with_config(FilterConfig::default().with_recency_window_days(5.0)),
        )
        .expect("register");
    let alerts = batch(
        "s3",
        vec![
            (columns::JD, floats(&[100.0, 110.0])),
            (columns::JDSTARTHIST, floats(&[96.0, 100.0])),
        ],
    );
    assert_eq!(
        registry.evaluate("young", &alerts).expect("mask").to_vec(),
        vec![true, false]
    );
}

#[test]
fn scenario_galactic_exclusion() {
    let mut registry = FilterRegistry::new();
    registry
        .register(CompositeFilter::new(
            "off_plane",
            FilterBuilder::leaf().galactic_exclusion().build(),
        ))
        .expect("register");
    let alerts = batch(
        "s4",
        vec![(columns::GALACTIC_LATITUDE, floats(&[20.0, -5.0, -16.0]))],
    );
    assert_eq!(
        registry.evaluate("off_plane", &alerts).expect("mask").to_vec(),
        vec![true, false, true]
    );
}

#[test]
fn scenario_non_bogus_and_bright() {
    let mut registry = FilterRegistry::new();
    registry
        .register(CompositeFilter::new(
            "bright_real",
            FilterBuilder::and().non_bogus().brightness().build(),
        ))
        .expect("register");
    let alerts = batch(
        "s5",
        vec![
            (columns::RB, floats(&[0.95, 0.5])),
            (columns::MAGPSF, floats(&[16.0, 16.0])),
        ],
    );
    assert_eq!(
        registry.evaluate("bright_real", &alerts).expect("mask").to_vec(),
        vec![true, false]
    );
}

#[test]
fn fast_transients_end_to_end() {
    let names = ["pass", "faint", "galactic", "old", "star", "bogus", "host"];
    let schema = Arc::new(Schema::new(vec![
        Field::new(columns::OBJECT_ID, DataType::Utf8, false),
        Field::new(columns::RB, DataType::Float64, true),
        Field::new(columns::MAGPSF, DataType::Float64, true),
        Field::new(columns::JD, DataType::Float64, true),
        Field::new(columns::JDSTARTHIST, DataType::Float64, true),
        Field::new(columns::RA, DataType::Float64, true),
        Field::new(columns::DEC, DataType::Float64, true),
        Field::new(columns::CLASSIFICATION, DataType::Utf8, true),
    ]));
    // (192.86, 27.13) is the north galactic pole, ecliptic latitude ~29.8.
    // (266.4, -28.94) is the galactic centre.
    let alerts = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(names.to_vec())) as ArrayRef,
            floats(&[0.95, 0.95, 0.95, 0.95, 0.95, 0.5, 0.95]),
            floats(&[16.5, 18.0, 16.5, 16.5, 16.5, 16.5, 16.5]),
            floats(&[10.0, 10.0, 10.0, 20.0, 10.0, 10.0, 10.0]),
            floats(&[8.0, 8.0, 8.0, 8.0, 8.0, 8.0, 8.0]),
            floats(&[192.86, 192.86, 266.4, 192.86, 192.86, 192.86, 192.86]),
            floats(&[27.13, 27.13, -28.94, 27.13, 27.13, 27.13, 27.13]),
            Arc::new(StringArray::from(vec![
                labels::SN_CANDIDATE,
                labels::KN_CANDIDATE,
                labels::AMBIGUOUS,
                labels::EARLY_SN_IA_CANDIDATE,
                "Star",
                labels::SN_CANDIDATE,
                "Galaxy",
            ])),
        ],
    )
    .expect("record batch");

    let registry = Arc::new(FilterRegistry::with_builtins().expect("builtins"));
    let adapter = BatchAdapter::new(Arc::clone(&registry));
    let mask = adapter
        .evaluate(GVOM_FAST_TRANSIENTS, &alerts, "gvom")
        .expect("mask");
    assert_eq!(
        mask,
        BooleanArray::from(vec![true, false, false, false, false, false, false])
    );

    let with_hosts = adapter.with_catalog_hosts(["Galaxy"]);
    let selected = with_hosts
        .select(GVOM_FAST_TRANSIENTS, &alerts, "gvom")
        .expect("selection");
    let kept = selected
        .column_by_name(columns::OBJECT_ID)
        .expect("objectId")
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("utf8")
        .iter()
        .flatten()
        .map(str::to_string)
        .collect::<Vec<_>>();
    assert_eq!(kept, vec!["pass", "host"]);
}

#[test]
fn fast_transients_with_resolver() {
    let mut rng = fastrand::Rng::with_seed(7);
    let alerts = common::random_alerts(&mut rng, 512);
    let registry = Arc::new(FilterRegistry::with_builtins().expect("builtins"));

    let without = BatchAdapter::new(Arc::clone(&registry));
    let err = without
        .evaluate(GVOM_FAST_TRANSIENTS, &alerts, "random")
        .expect_err("labels must be resolved");
    assert!(matches!(err, FilterError::ResolverUnavailable { .. }));

    let adapter = BatchAdapter::new(registry).with_resolver(common::stub_resolver());
    let mask = adapter
        .evaluate(GVOM_FAST_TRANSIENTS, &alerts, "random")
        .expect("mask");
    assert_eq!(mask.len(), 512);
}

#[test]
fn cycles_are_rejected_at_registration() {
    let mut registry = FilterRegistry::with_builtins().expect("builtins");
    registry
        .register(CompositeFilter::new(
            "moving",
            FilterBuilder::and()
                .filter(SSO_ZTF_CANDIDATES)
                .not_group(|b| b.present(columns::TRACKLET))
                .build(),
        ))
        .expect("moving");
    let err = registry
        .register(CompositeFilter::new(
            SSO_ZTF_CANDIDATES,
            FilterBuilder::or().sso_candidate().filter("moving").build(),
        ))
        .expect_err("cycle");
    assert_eq!(
        err,
        RegistryError::Cycle(CompositionCycleError {
            path: vec![
                SSO_ZTF_CANDIDATES.to_string(),
                "moving".to_string(),
                SSO_ZTF_CANDIDATES.to_string(),
            ],
        })
    );
}

#[test]
fn mismatched_columns_are_schema_errors() {
    let err = ColumnBatch::try_new(
        "ragged",
        vec![
            (columns::RB, floats(&[0.9, 0.8])),
            (columns::MAGPSF, floats(&[16.0])),
        ],
    )
    .expect_err("ragged batch");
    assert!(matches!(err, SchemaError::LengthMismatch { .. }));
    assert_eq!(err.batch().as_str(), "ragged");
}
