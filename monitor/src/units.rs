pub fn to_fahrenheit(celsius: f64) -> f64 {
    celsius * (9.0 / 5.0) + 32.0
}

pub fn to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * (5.0 / 9.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_points() {
        assert_eq!(to_fahrenheit(0.0), 32.0);
        assert_eq!(to_fahrenheit(100.0), 212.0);
        assert_eq!(to_celsius(32.0), 0.0);
        // -40 is the same in both scales
        assert_eq!(to_fahrenheit(-40.0), -40.0);
        assert_eq!(to_celsius(-40.0), -40.0);
    }

    #[test]
    fn test_round_trip() {
        let mut x = -40.0;
        while x <= 212.0 {
            assert!((to_celsius(to_fahrenheit(x)) - x).abs() < 1e-9);
            assert!((to_fahrenheit(to_celsius(x)) - x).abs() < 1e-9);
            x += 0.25;
        }
    }
}
