use acqsync_frame::{Decoder, FrameError, FrameReader};
use acqsync_transport::DeviceStream;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let stream =
        DeviceStream::replay(&args.path).map_err(|err| transport_error("open failed", err))?;
    let mut reader = FrameReader::new(stream);
    let mut decoder = Decoder::for_device(
        args.device_args.serial.as_bytes(),
        args.device_args.class.into(),
        usize::from(args.device_args.channels),
    )
    .map_err(|err| frame_error("invalid device", err))?;

    let mut index = 0u64;
    while args.limit.map_or(true, |limit| index < limit) {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::SourceClosed) => break,
            Err(err) => return Err(frame_error("read failed", err)),
        };
        let decoded = decoder
            .decode(&frame)
            .map_err(|err| frame_error("decode failed", err))?;
        print_frame(index, &decoded, format);
        index += 1;
    }

    Ok(SUCCESS)
}
