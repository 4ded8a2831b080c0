use crate::{math::*, state::RelativisticState, timeline::Timeline};

/// Where an observer sees a body, given the light travel time from it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApparentState {
    /// How long ago the observed light left the body
    pub age: f64,
    pub position: DVec3,
    pub rotation: Quat,
}

/// Reconstructs what `observer` sees of a body from its recorded history
///
/// The light that reaches the observer now left the body at the age where `c * age` first covers the
/// distance between them. Between two recorded snapshots the crossing is found by linear interpolation.
/// Returns `None` if even the oldest snapshot is too young for its light to have arrived
pub fn apparent_state(timeline: &Timeline<RelativisticState>, observer: &DVec3, c: f64) -> Option<ApparentState> {
    if !c.is_finite() || c <= 0.0 {
        return None
    }

    let mut younger: Option<(f64, &RelativisticState, f64)> = None; // (age, snapshot, gap)
    for entry in timeline.iter() {
        let state = &entry.snapshot;
        // how far the light has travelled past the observer, negative while it is still on its way
        let gap = c * entry.age - state.position.length_to(observer);

        if gap >= 0.0 {
            let (age, position) = match younger {
                Some((younger_age, younger_state, younger_gap)) => {
                    let t = younger_gap / (younger_gap - gap);
                    (
                        younger_age + (entry.age - younger_age) * t,
                        younger_state.position + (state.position - younger_state.position) * t,
                    )
                },
                None => (entry.age, state.position),
            };
            return Some(ApparentState { age, position, rotation: state.rotation() })
        }

        younger = Some((entry.age, state, gap));
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_close(expected: f64, actual: f64) {
        assert!((expected - actual).abs() < 1e-9, "expected {}, got {}", expected, actual);
    }

    fn body_at(x: f64) -> RelativisticState {
        let mut state = RelativisticState::at_rest(1.0);
        state.position = DVec3::new(x, 0.0, 0.0);
        state
    }

    #[test]
    fn stationary_body_is_seen_one_light_distance_ago() {
        let mut timeline = Timeline::new(20.0);
        for _ in 0..=12 {
            timeline.advance(1.0, body_at(10.0)).unwrap();
        }

        let apparent = apparent_state(&timeline, &DVec3::zero(), 1.0).unwrap();
        assert_close(10.0, apparent.age);
        assert_close(10.0, apparent.position.x);
    }

    #[test]
    fn receding_body_is_interpolated() {
        // recorded once per unit of time, now at x = 10 and receding at half the speed of light
        let mut timeline = Timeline::new(20.0);
        for k in 0..=15 {
            timeline.advance(1.0, body_at(2.5 + 0.5 * k as f64)).unwrap();
        }

        // age = 10 - age / 2 crosses at 20/3, between two recorded snapshots
        let apparent = apparent_state(&timeline, &DVec3::zero(), 1.0).unwrap();
        assert_close(20.0 / 3.0, apparent.age);
        assert_close(20.0 / 3.0, apparent.position.x);
    }

    #[test]
    fn short_history_is_not_visible_yet() {
        let mut timeline = Timeline::new(20.0);
        for _ in 0..5 {
            timeline.advance(1.0, body_at(10.0)).unwrap();
        }
        assert!(apparent_state(&timeline, &DVec3::zero(), 1.0).is_none());
        assert!(apparent_state(&Timeline::new(1.0), &DVec3::zero(), 1.0).is_none());
    }

    #[test]
    fn observer_on_the_body_sees_the_present() {
        let mut timeline = Timeline::new(5.0);
        timeline.advance(1.0, body_at(1.0)).unwrap();
        timeline.advance(1.0, body_at(3.0)).unwrap();

        let apparent = apparent_state(&timeline, &DVec3::new(3.0, 0.0, 0.0), 1.0).unwrap();
        assert_eq!(0.0, apparent.age);
        assert_eq!(3.0, apparent.position.x);
    }

    #[test]
    fn invalid_speed_of_light() {
        let mut timeline = Timeline::new(5.0);
        timeline.advance(1.0, body_at(0.0)).unwrap();
        assert!(apparent_state(&timeline, &DVec3::zero(), 0.0).is_none());
    }
}
