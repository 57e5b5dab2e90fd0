//! Expansion of step-encoded sample blocks into explicit series

use tracing::warn;

use crate::app::models::SampleBlock;
use crate::errors::{DataError, DataResult};

/// Decodes `getmeasure` blocks into equal-length timestamps and values
///
/// Blocks are concatenated in payload order without sorting. A block with a
/// `step_time` of `step` and `n` value tuples yields the timestamps
/// `beg, beg + step, ..., beg + (n - 1) * step`; a block without one is a
/// single sample at `beg_time`. Only the first field of each tuple is kept,
/// and a JSON `null` becomes `NaN`.
///
/// # Errors
///
/// Returns `DataError::InvalidStep` for a zero or negative `step_time`
pub fn decode_series(blocks: &[SampleBlock]) -> DataResult<(Vec<i64>, Vec<f64>)> {
    let capacity = blocks.iter().map(|block| block.value.len().max(1)).sum();
    let mut times = Vec::with_capacity(capacity);
    let mut values = Vec::with_capacity(capacity);

    for block in blocks {
        match block.step_time {
            None => {
                let dropped = unstepped_surplus(block);
                if dropped > 0 {
                    warn!(
                        "Block at {} has no step_time; keeping its first sample and dropping {} more",
                        block.beg_time, dropped
                    );
                }
                times.push(block.beg_time);
                values.push(block.value.first().map_or(f64::NAN, |fields| first_field(fields)));
            }
            Some(step) if step > 0 => {
                times.extend((0..block.value.len() as i64).map(|i| {
                    block.beg_time.saturating_add(i.saturating_mul(step))
                }));
                values.extend(block.value.iter().map(|fields| first_field(fields)));
            }
            Some(step) => {
                return Err(DataError::InvalidStep {
                    beg_time: block.beg_time,
                    step,
                });
            }
        }
    }

    Ok((times, values))
}

/// Tuples beyond the first in a block without a step interval
fn unstepped_surplus(block: &SampleBlock) -> usize {
    match block.step_time {
        None => block.value.len().saturating_sub(1),
        Some(_) => 0,
    }
}

fn first_field(fields: &[Option<f64>]) -> f64 {
    fields.first().copied().flatten().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(json: &str) -> Vec<SampleBlock> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_unstepped_surplus_counts_dropped_tuples() {
        let payload = blocks(
            r#"[{"beg_time": 1000, "value": [[1], [2], [3]]},
                {"beg_time": 2000, "value": [[4]]},
                {"beg_time": 3000, "value": []},
                {"beg_time": 4000, "step_time": 60, "value": [[5], [6]]}]"#,
        );
        let surplus: Vec<usize> = payload.iter().map(unstepped_surplus).collect();
        assert_eq!(surplus, vec![2, 0, 0, 0]);

        let (times, values) = decode_series(&payload[..1]).unwrap();
        assert_eq!(times, vec![1000]);
        assert_eq!(values, vec![1.0]);
    }

    #[test]
    fn test_stepped_block_expansion() {
        let (times, values) =
            decode_series(&blocks(r#"[{"beg_time": 1000, "step_time": 60, "value": [[1], [2], [3]]}]"#))
                .unwrap();

        assert_eq!(times, vec![1000, 1060, 1120]);
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mixed_blocks_concatenate_in_payload_order() {
        let payload = blocks(
            r#"[
                {"beg_time": 1642204800, "step_time": 600, "value": [[1013.2], [1013.4]]},
                {"beg_time": 1642206400, "value": [[1012.9]]},
                {"beg_time": 1642100000, "step_time": 300, "value": [[1011.0], [1011.1], [1011.3]]}
            ]"#,
        );

        let (times, values) = decode_series(&payload).unwrap();

        assert_eq!(times.len(), 2 + 1 + 3);
        assert_eq!(times.len(), values.len());
        // No re-sorting: the last block is earlier but stays last
        assert_eq!(
            times,
            vec![1642204800, 1642205400, 1642206400, 1642100000, 1642100300, 1642100600]
        );
        assert_eq!(values[2], 1012.9);
        assert_eq!(values[5], 1011.3);
    }

    #[test]
    fn test_only_first_field_is_used() {
        let (_, values) = decode_series(&blocks(
            r#"[{"beg_time": 0, "step_time": 1, "value": [[20.5, 64], [20.7, 63]]}]"#,
        ))
        .unwrap();
        assert_eq!(values, vec![20.5, 20.7]);
    }

    #[test]
    fn test_null_values_become_nan() {
        let (times, values) = decode_series(&blocks(
            r#"[{"beg_time": 0, "step_time": 10, "value": [[null], [], [4]]}]"#,
        ))
        .unwrap();
        assert_eq!(times, vec![0, 10, 20]);
        assert!(values[0].is_nan());
        assert!(values[1].is_nan());
        assert_eq!(values[2], 4.0);
    }

    #[test]
    fn test_empty_payload() {
        let (times, values) = decode_series(&[]).unwrap();
        assert!(times.is_empty());
        assert!(values.is_empty());

        let (times, values) =
            decode_series(&blocks(r#"[{"beg_time": 5, "step_time": 60, "value": []}]"#)).unwrap();
        assert!(times.is_empty());
        assert!(values.is_empty());
    }

    #[test]
    fn test_non_positive_step_is_rejected() {
        for step in [0, -60] {
            let payload = vec![SampleBlock {
                beg_time: 1000,
                step_time: Some(step),
                value: vec![vec![Some(1.0)], vec![Some(2.0)]],
            }];
            match decode_series(&payload) {
                Err(DataError::InvalidStep { beg_time, step: s }) => {
                    assert_eq!(beg_time, 1000);
                    assert_eq!(s, step);
                }
                other => panic!("Expected InvalidStep, got {:?}", other),
            }
        }
    }
}
