//! Common test utilities for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use arrow::{
    array::{
        Array, ArrayRef, AsArray, Float64Array, Int64Array, StringArray, UInt32Array,
    },
    compute::{cast, take},
    datatypes::{DataType, Field, Float64Type, Schema},
    record_batch::RecordBatch,
};
use fink_filters::{
    batch::columns,
    classification::{labels, ClassificationResolver, FnResolver, ScoreColumns},
};

const CATALOG_TAGS: [&str; 5] = ["Unknown", "Galaxy", "Star", "Seyfert_1", "QSO"];

/// Alert batch with every documented column, filled from `rng`.
///
/// Roughly one value in ten is missing (null, or `NaN` for floats) and
/// every fiftieth right ascension falls outside the equatorial domain.
pub fn random_alerts(rng: &mut fastrand::Rng, rows: usize) -> RecordBatch {
    let float = |rng: &mut fastrand::Rng, lo: f64, hi: f64| -> Option<f64> {
        match rng.u8(0..20) {
            0 => None,
            1 => Some(f64::NAN),
            _ => Some(lo + rng.f64() * (hi - lo)),
        }
    };

    let object_id: Vec<String> = (0..rows).map(|i| format!("ZTF{i:08}")).collect();
    let magpsf: Vec<_> = (0..rows).map(|_| float(rng, 13.0, 21.0)).collect();
    let rb: Vec<_> = (0..rows).map(|_| float(rng, 0.5, 1.0)).collect();
    let drb: Vec<_> = (0..rows).map(|_| float(rng, 0.0, 1.0)).collect();
    let classtar: Vec<_> = (0..rows).map(|_| float(rng, 0.0, 1.0)).collect();
    let ra: Vec<_> = (0..rows)
        .map(|i| {
            if i % 50 == 49 {
                Some(360.0 + rng.f64())
            } else {
                float(rng, 0.0, 359.999)
            }
        })
        .collect();
    let dec: Vec<_> = (0..rows).map(|_| float(rng, -90.0, 90.0)).collect();
    let jdstarthist: Vec<_> = (0..rows).map(|_| float(rng, 2_460_000.0, 2_460_010.0)).collect();
    let jd: Vec<_> = jdstarthist
        .iter()
        .map(|start| start.map(|start| start + rng.f64() * 10.0))
        .collect();
    let ndethist: Vec<_> = (0..rows)
        .map(|_| (rng.u8(0..10) != 0).then(|| rng.i64(0..40)))
        .collect();
    let roid: Vec<_> = (0..rows)
        .map(|_| (rng.u8(0..10) != 0).then(|| rng.i64(0..4)))
        .collect();
    let spicy_id: Vec<_> = (0..rows)
        .map(|_| match rng.u8(0..10) {
            0 => None,
            1..=5 => Some(-1),
            _ => Some(rng.i64(0..50_000)),
        })
        .collect();
    let mut scores = || -> Vec<Option<f64>> { (0..rows).map(|_| float(rng, 0.0, 1.0)).collect() };
    let mulens = scores();
    let snn_snia = scores();
    let snn_sn = scores();
    let rf_snia = scores();
    let rf_kn = scores();
    let cdsxmatch: Vec<_> = (0..rows)
        .map(|_| CATALOG_TAGS[rng.usize(0..CATALOG_TAGS.len())])
        .collect();
    let tracklet: Vec<_> = (0..rows)
        .map(|i| if rng.u8(0..30) == 0 { Some(format!("TRCK_{i}")) } else { None })
        .collect();

    let fields_and_columns: Vec<(Field, ArrayRef)> = vec![
        (
            Field::new(columns::OBJECT_ID, DataType::Utf8, false),
            Arc::new(StringArray::from(object_id)),
        ),
        float_column(columns::MAGPSF, magpsf),
        float_column(columns::RB, rb),
        float_column(columns::DRB, drb),
        float_column(columns::CLASSTAR, classtar),
        float_column(columns::RA, ra),
        float_column(columns::DEC, dec),
        float_column(columns::JD, jd),
        float_column(columns::JDSTARTHIST, jdstarthist),
        int_column(columns::NDETHIST, ndethist),
        int_column(columns::ROID, roid),
        float_column(columns::MULENS, mulens),
        float_column(columns::SNN_SNIA_VS_NONIA, snn_snia),
        float_column(columns::SNN_SN_VS_ALL, snn_sn),
        float_column(columns::RF_SNIA_VS_NONIA, rf_snia),
        float_column(columns::RF_KN_VS_NONKN, rf_kn),
        (
            Field::new(columns::CDSXMATCH, DataType::Utf8, true),
            Arc::new(StringArray::from(cdsxmatch)),
        ),
        (
            Field::new(columns::TRACKLET, DataType::Utf8, true),
            Arc::new(StringArray::from(tracklet)),
        ),
        int_column(columns::SPICY_ID, spicy_id),
    ];
    let (fields, arrays): (Vec<_>, Vec<_>) = fields_and_columns.into_iter().unzip();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).expect("alert batch")
}

fn float_column(name: &str, values: Vec<Option<f64>>) -> (Field, ArrayRef) {
    (
        Field::new(name, DataType::Float64, true),
        Arc::new(Float64Array::from(values)),
    )
}

fn int_column(name: &str, values: Vec<Option<i64>>) -> (Field, ArrayRef) {
    (
        Field::new(name, DataType::Int64, true),
        Arc::new(Int64Array::from(values)),
    )
}

/// Reorders every column of `batch` by `indices`.
pub fn take_rows(batch: &RecordBatch, indices: &[u32]) -> RecordBatch {
    let indices = UInt32Array::from(indices.to_vec());
    let columns = batch
        .columns()
        .iter()
        .map(|column| take(column.as_ref(), &indices, None).expect("take"))
        .collect();
    RecordBatch::try_new(batch.schema(), columns).expect("permuted batch")
}

/// Random permutation of `0..len`.
pub fn shuffled(rng: &mut fastrand::Rng, len: usize) -> Vec<u32> {
    let mut indices: Vec<u32> = (0..len as u32).collect();
    rng.shuffle(&mut indices);
    indices
}

fn score(scores: &ScoreColumns<'_>, name: &str) -> Float64Array {
    let column = scores.get(name).expect("score column");
    cast(column.as_ref(), &DataType::Float64)
        .expect("numeric score")
        .as_primitive::<Float64Type>()
        .clone()
}

/// Row-wise stand-in for the external resolver.
///
/// Kilonova and supernova scores above 0.5 win, tracklets and solar-system
/// tags come next, everything else passes the catalog tag through.
pub fn stub_resolver() -> Arc<dyn ClassificationResolver> {
    Arc::new(FnResolver::new(|scores: &ScoreColumns<'_>| {
        let kn = score(scores, columns::RF_KN_VS_NONKN);
        let sn = score(scores, columns::SNN_SN_VS_ALL);
        let roid = score(scores, columns::ROID);
        let tag = scores
            .get(columns::CDSXMATCH)
            .expect("cdsxmatch")
            .as_string::<i32>()
            .clone();
        let tracklet = scores
            .get(columns::TRACKLET)
            .expect("tracklet")
            .as_string::<i32>()
            .clone();
        let above = |values: &Float64Array, i: usize| values.is_valid(i) && values.value(i) > 0.5;
        let out: StringArray = (0..scores.num_rows())
            .map(|i| {
                Some(if above(&kn, i) {
                    labels::KN_CANDIDATE.to_string()
                } else if above(&sn, i) {
                    labels::SN_CANDIDATE.to_string()
                } else if tracklet.is_valid(i) {
                    labels::TRACKLET.to_string()
                } else if roid.is_valid(i) && roid.value(i) == 3.0 {
                    labels::SOLAR_SYSTEM_CANDIDATE.to_string()
                } else if tag.is_valid(i) {
                    tag.value(i).to_string()
                } else {
                    labels::UNKNOWN.to_string()
                })
            })
            .collect();
        Ok(out)
    }))
}
