
pub mod bit_fields;
pub mod kinematics;
