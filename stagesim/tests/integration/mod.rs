mod calibrated_motion;
mod collision_scenario;
mod file_scenarios;
