pub mod annotate_people_use_case;
pub mod count_tracker;
pub mod detection_session;
pub mod display_sink;
pub mod frame_pacer;
