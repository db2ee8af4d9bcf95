mod bind;
mod command_id;
mod command_status;
mod enquire_link;
mod fixed_string;
mod generic_nack;
mod interface_version;
mod numeric_plan_indicator;
mod tlv;
mod type_of_number;
mod unbind;

pub use bind::{Bind, BindBuilder, BindResponse, BindType};
pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use enquire_link::{EnquireLink, EnquireLinkResponse};
pub use fixed_string::{
    AddressRange, FixedString, FixedStringError, Password, SystemId, SystemType,
};
pub use generic_nack::GenericNack;
pub use interface_version::InterfaceVersion;
pub use numeric_plan_indicator::NumericPlanIndicator;
pub use tlv::{Tlv, SC_INTERFACE_VERSION};
pub use type_of_number::TypeOfNumber;
pub use unbind::{Unbind, UnbindResponse};
