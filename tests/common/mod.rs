use assert_cmd::Command;

pub fn standupd_bin() -> Command {
    #[allow(deprecated)]
    {
        Command::cargo_bin("standupd").expect("standupd test binary should build")
    }
}
