use rand::{rngs::SmallRng, Rng, SeedableRng};
use save_core::{format_packed_values, parse_packed_grid, parse_packed_values};

#[test]
fn parsed_grids_flatten_back_to_save_order() {
    let mut rng = SmallRng::seed_from_u64(0x7157_b0b0);

    for _ in 0..64 {
        let width = rng.gen_range(1..=24u32);
        let height = rng.gen_range(1..=24u32);
        let stored: Vec<f64> = (0..width * height)
            .map(|_| {
                let depth: f64 = rng.gen_range(0.0..8.0);
                (depth * 1000.0).round() / 1000.0
            })
            .collect();

        let packed = format_packed_values(&stored);
        let grid = parse_packed_grid(&packed, width, height).unwrap();
        assert_eq!((grid.width(), grid.height()), (width, height));

        let x = rng.gen_range(0..width);
        let y = rng.gen_range(0..height);
        assert_eq!(grid.get(x, y), Some(stored[(y * width + x) as usize]));

        let flattened = grid.to_stored();
        assert_eq!(flattened, stored);
        assert_eq!(parse_packed_values(&format_packed_values(&flattened)).unwrap(), stored);
    }
}

#[test]
fn trailing_dot_tokens_survive_a_round_trip() {
    let grid = parse_packed_grid("0.87. 1. 1.0 0.5.", 2, 2).unwrap();
    assert_eq!(grid.to_stored(), vec![0.87, 1.0, 1.0, 0.5]);
    assert_eq!(grid.get(1, 0), Some(1.0));
    assert_eq!(grid.get(0, 1), Some(1.0));
}
