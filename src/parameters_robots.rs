//! Hardcoded geometry of the supported arm

pub mod widowx_kinematics {
    use crate::parameters::widowx_kinematics::Parameters;

    impl Parameters {
        /// Trossen Robotics WidowX, link lengths in centimetres.
        pub fn widowx() -> Self {
            Parameters::new(9.0, 14.0, 5.0, 14.0, 14.0)
        }
    }

    impl Default for Parameters {
        fn default() -> Self {
            Self::widowx()
        }
    }
}
