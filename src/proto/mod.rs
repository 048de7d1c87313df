//! Protocol Buffer definitions and generated code for the gNMI service.
//!
//! Only the subset of `gnmi.proto` the monitor consumes is compiled (see
//! `proto/gnmi.proto` and `build.rs`): subscribe / get requests and
//! responses, paths and typed values.

#[allow(clippy::all)]
pub mod gnmi {
    tonic::include_proto!("gnmi");
}

mod gnmi_ext;
