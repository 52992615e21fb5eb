fn main() -> std::process::ExitCode {
    dashcli::cli::run()
}
