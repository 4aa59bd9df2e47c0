use hub_core::cap::sensor::PowerReading;
use proptest::prelude::*;
use step_dimmer::StepMapper;

fn four_steps() -> StepMapper {
    StepMapper::new([10.0, 25.0, 50.0, 100.0]).unwrap()
}

#[test]
fn power_maps_to_nearest_step() {
    let mapper = four_steps();
    let cases = [(0.0, 0), (5.0, 1), (10.0, 1), (18.0, 2), (25.0, 2), (70.0, 3), (110.0, 4)];
    for (watts, step) in cases {
        assert_eq!(mapper.power_to_step(PowerReading::Watts(watts)), step, "{watts} W");
    }
}

#[test]
fn unknown_and_negative_power_mean_off() {
    let mapper = four_steps();
    assert_eq!(mapper.power_to_step(PowerReading::Unknown), 0);
    assert_eq!(mapper.power_to_step(PowerReading::Watts(-3.0)), 0);
    assert_eq!(mapper.power_to_brightness(PowerReading::Unknown), 0);
}

#[test]
fn brightness_rounds_to_step() {
    let mapper = four_steps();
    let cases = [(0, 0), (1, 0), (63, 1), (127, 2), (191, 3), (255, 4)];
    for (brightness, step) in cases {
        assert_eq!(mapper.brightness_to_step(brightness), step, "brightness {brightness}");
    }
}

#[test]
fn out_of_range_brightness_is_clamped() {
    let mapper = four_steps();
    assert_eq!(mapper.brightness_to_step(-20), 0);
    assert_eq!(mapper.brightness_to_step(1000), 4);
}

#[test]
fn steps_map_to_brightness() {
    let mapper = four_steps();
    let shown: Vec<u8> = (0..=4).map(|s| mapper.step_to_brightness(s)).collect();
    assert_eq!(shown, vec![0, 63, 127, 191, 255]);
    assert_eq!(mapper.power_to_brightness(PowerReading::Watts(48.0)), 191);
}

#[test]
fn toggle_counts_for_transitions() {
    let mapper = four_steps();
    let cases = [
        (10.0, 63, 0),
        (0.0, 63, 1),
        (0.0, 127, 3),
        (0.0, 255, 7),
        (10.0, 127, 2),
        (10.0, 255, 6),
        (10.0, 191, 4),
        (100.0, 63, 2),
        (50.0, 63, 4),
        (10.0, 0, 1),
        (100.0, 0, 1),
        (0.0, 0, 0),
    ];
    for (watts, brightness, toggles) in cases {
        assert_eq!(
            mapper.toggles_for_brightness(PowerReading::Watts(watts), brightness),
            toggles,
            "{watts} W -> brightness {brightness}"
        );
    }
}

#[test]
fn single_step_lamp() {
    let mapper = StepMapper::new([40.0]).unwrap();
    assert_eq!(mapper.brightness_to_step(127), 0);
    assert_eq!(mapper.brightness_to_step(128), 1);
    assert_eq!(mapper.toggles_between(0, 1), 1);
    assert_eq!(mapper.toggles_between(1, 0), 1);
    assert_eq!(mapper.step_to_brightness(1), 255);
}

fn mapper_strategy() -> impl Strategy<Value = StepMapper> {
    prop::collection::btree_set(1u32..5_000, 1..24)
        .prop_map(|set| StepMapper::new(set.into_iter().map(f64::from)).unwrap())
}

proptest! {
    #[test]
    fn staying_put_needs_no_toggles(mapper in mapper_strategy(), step in 0u32..24) {
        let step = step.min(mapper.num_steps());
        prop_assert_eq!(mapper.toggles_between(step, step), 0);
    }

    #[test]
    fn lit_to_lit_needs_even_toggles(mapper in mapper_strategy(), a in 1u32..24, b in 1u32..24) {
        let n = mapper.num_steps();
        let (current, target) = (a.min(n), b.min(n));
        prop_assume!(current != target);
        let toggles = mapper.toggles_between(current, target);
        prop_assert!(toggles > 0);
        prop_assert_eq!(toggles % 2, 0);
        prop_assert!(toggles <= 2 * (n - 1));
    }

    #[test]
    fn leaving_off_needs_odd_toggles(mapper in mapper_strategy(), t in 1u32..24) {
        let target = t.min(mapper.num_steps());
        prop_assert_eq!(mapper.toggles_between(0, target) % 2, 1);
        prop_assert_eq!(mapper.toggles_between(target, 0), 1);
    }

    #[test]
    fn every_step_survives_brightness_round_trip(mapper in mapper_strategy(), s in 0u32..24) {
        let step = s.min(mapper.num_steps());
        let shown = mapper.step_to_brightness(step);
        prop_assert_eq!(mapper.brightness_to_step(i64::from(shown)), step);
    }

    #[test]
    fn thresholds_map_to_their_own_step(mapper in mapper_strategy()) {
        for (idx, threshold) in mapper.thresholds().iter().enumerate() {
            prop_assert_eq!(mapper.power_to_step(PowerReading::Watts(*threshold)), idx as u32 + 1);
        }
    }

    #[test]
    fn non_positive_power_is_off(mapper in mapper_strategy(), watts in -1_000.0f64..=0.0) {
        prop_assert_eq!(mapper.power_to_step(PowerReading::Watts(watts)), 0);
    }

    #[test]
    fn brightness_grows_with_step(mapper in mapper_strategy()) {
        let shown: Vec<u8> =
            (0..=mapper.num_steps()).map(|s| mapper.step_to_brightness(s)).collect();
        prop_assert!(shown.windows(2).all(|pair| pair[0] <= pair[1]));
        prop_assert_eq!(shown.last().copied(), Some(255));
    }

    #[test]
    fn brightness_step_is_in_range(mapper in mapper_strategy(), brightness in -500i64..1_000) {
        prop_assert!(mapper.brightness_to_step(brightness) <= mapper.num_steps());
    }
}
