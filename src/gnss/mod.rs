
pub mod gps_l1_ca;
