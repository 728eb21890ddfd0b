mod test_engine_init_failure;
mod test_match_timeout;
mod test_status_never_regresses;
