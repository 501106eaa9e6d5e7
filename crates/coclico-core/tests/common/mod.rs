use coclico_core::PointCloud;

pub const PIXEL_SIZE: f64 = 0.5;

/// 10 m × 10 m tile sampled every 0.5 m: ground (class 2) at 100 m around a
/// 3 m × 3 m building (class 6) whose roof sits at `110 + roof_offset`.
pub fn scene(roof_offset: f64) -> PointCloud {
    let mut cloud = PointCloud::default();
    for i in 0..=20 {
        for j in 0..=20 {
            let (x, y) = (i as f64 * PIXEL_SIZE, j as f64 * PIXEL_SIZE);
            if (6..=12).contains(&i) && (6..=12).contains(&j) {
                cloud.push(x, y, 110.0 + roof_offset, 6);
            } else {
                cloud.push(x, y, 100.0, 2);
            }
        }
    }
    cloud
}

/// `n` points of class `class` on a line.
pub fn line(class: u8, n: usize) -> PointCloud {
    let records: Vec<_> = (0..n).map(|i| (i as f64, 0.0, 0.0, class)).collect();
    PointCloud::from_records(&records)
}

pub const CONFIG: &str = r#"
mpap0:
  weights: { "1": 1, "2": 1, "6": 2 }
  notes:
    ref_count_threshold: 1000
    above_threshold: { min_point: { metric: 0, note: 1 }, max_point: { metric: 0.1, note: 0 } }
    under_threshold: { min_point: { metric: 0, note: 1 }, max_point: { metric: 4, note: 0 } }
mpla0:
  weights: { "2": 1, "6": 2 }
  notes:
    ref_pixel_count_threshold: 1000
    above_threshold: { min_point: { metric: 0.9, note: 0 }, max_point: { metric: 1, note: 1 } }
    under_threshold: { min_point: { metric: 20, note: 1 }, max_point: { metric: 100, note: 0 } }
malt0:
  weights: { "2": 1, "6": 2 }
  notes:
    max_diff: { coefficient: 1, min_point: { metric: 0.1, note: 1 }, max_point: { metric: 4, note: 0 } }
    mean_diff: { coefficient: 2, min_point: { metric: 0.01, note: 1 }, max_point: { metric: 0.5, note: 0 } }
    std_diff: { coefficient: 2, min_point: { metric: 0.01, note: 1 }, max_point: { metric: 0.5, note: 0 } }
mobj0:
  weights: { "2": 1, "6": 2, "9": 0 }
  notes:
    ref_object_count_threshold: 20
    above_threshold: { min_point: { metric: 0.8, note: 0 }, max_point: { metric: 1, note: 1 } }
    under_threshold: { min_point: { metric: 0, note: 1 }, max_point: { metric: 4, note: 0 } }
"#;
