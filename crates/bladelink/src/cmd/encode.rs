use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let command = args.frame.command()?;
    let frame = command
        .encode()
        .map_err(|err| frame_error("encode failed", err))?;
    print_frame(&frame, format);
    Ok(SUCCESS)
}
