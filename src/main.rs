fn main() -> std::process::ExitCode {
    vodpulse_lib::run()
}
