//! Defines the link geometry of the arm

pub mod widowx_kinematics {
    /// Link lengths of the arm, together with the values derived from them once at construction.
    /// See [parameters_robots.rs](parameters_robots.rs) for the WidowX preset.
    ///
    /// The shoulder-to-elbow link is not straight: it is modelled as a vertical segment `l1`
    /// followed by a horizontal segment `l2`. The solver only needs the diagonal `d` joining
    /// both ends and the angle `alpha` of that diagonal, so these are precomputed.
    ///
    /// Fields are private so derived values can never go out of sync with the link lengths.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Parameters {
        /// Height of the shoulder axis above the base (base to joint 2).
        l0: f64,

        /// Vertical part of the shoulder-to-elbow link.
        l1: f64,

        /// Horizontal part of the shoulder-to-elbow link.
        l2: f64,

        /// Elbow to wrist pitch axis.
        l3: f64,

        /// Wrist pitch axis to the gripper center point.
        l4: f64,

        /// Diagonal of the shoulder-to-elbow link, `sqrt(l1² + l2²)`.
        d: f64,

        /// Angle of the diagonal, `atan2(l1, l2)`.
        alpha: f64,

        sin_alpha: f64,
        cos_alpha: f64,
    }

    impl Parameters {
        /// Creates the geometry from five link lengths, all in the same length unit.
        pub fn new(l0: f64, l1: f64, l2: f64, l3: f64, l4: f64) -> Self {
            let d = f64::hypot(l1, l2);
            let alpha = f64::atan2(l1, l2);
            Parameters {
                l0,
                l1,
                l2,
                l3,
                l4,
                d,
                alpha,
                sin_alpha: alpha.sin(),
                cos_alpha: alpha.cos(),
            }
        }

        pub fn l0(&self) -> f64 {
            self.l0
        }

        pub fn l1(&self) -> f64 {
            self.l1
        }

        pub fn l2(&self) -> f64 {
            self.l2
        }

        pub fn l3(&self) -> f64 {
            self.l3
        }

        pub fn l4(&self) -> f64 {
            self.l4
        }

        pub fn d(&self) -> f64 {
            self.d
        }

        pub fn alpha(&self) -> f64 {
            self.alpha
        }

        pub fn sin_alpha(&self) -> f64 {
            self.sin_alpha
        }

        pub fn cos_alpha(&self) -> f64 {
            self.cos_alpha
        }

        /// Distance from the shoulder axis to the gripper center point with the arm fully
        /// stretched. No target farther than this from the shoulder is reachable.
        pub fn reach(&self) -> f64 {
            self.d + self.l3 + self.l4
        }

        /// Convert to string yaml representation (quick viewing, etc).
        pub fn to_yaml(&self) -> String {
            format!(
                "widowx_geometry:\n  \
              l0: {}\n  \
              l1: {}\n  \
              l2: {}\n  \
              l3: {}\n  \
              l4: {}\n",
                self.l0, self.l1, self.l2, self.l3, self.l4
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::widowx_kinematics::Parameters;

    #[test]
    fn test_derived_values() {
        let parameters = Parameters::new(9.0, 14.0, 5.0, 14.0, 14.0);
        assert!((parameters.d() - 221.0_f64.sqrt()).abs() < 1e-12);
        assert!((parameters.alpha() - 14.0_f64.atan2(5.0)).abs() < 1e-12);
        assert!((parameters.sin_alpha() * parameters.d() - 14.0).abs() < 1e-9);
        assert!((parameters.cos_alpha() * parameters.d() - 5.0).abs() < 1e-9);
        assert!((parameters.reach() - (221.0_f64.sqrt() + 28.0)).abs() < 1e-12);
    }

    #[test]
    fn test_to_yaml() {
        let yaml = Parameters::new(9.0, 14.0, 5.0, 14.0, 14.0).to_yaml();
        assert!(yaml.starts_with("widowx_geometry:\n"));
        assert!(yaml.contains("l3: 14\n"));
    }
}
