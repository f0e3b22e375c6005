use unmapper::command_argument_builder;
use unmapper::handlers::{handle_extract, init_logging, print_banner};

#[tokio::main]
async fn main() {
    let matches = command_argument_builder().get_matches();

    init_logging(matches.get_flag("debug"));

    // Show banner unless --quiet flag is set
    if !matches.get_flag("quiet") {
        print_banner();
    }

    handle_extract(&matches).await;
}
