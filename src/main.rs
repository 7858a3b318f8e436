fn main() {
    let code = planner_e2e_env::run_cli();
    if code != 0 {
        std::process::exit(code);
    }
}
