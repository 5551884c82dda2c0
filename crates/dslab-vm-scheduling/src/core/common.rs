/// Result of checking whether a resource demand can be placed on a host.
#[derive(Clone, Debug, PartialEq)]
pub enum AllocationVerdict {
    Success,
    NotEnoughResource {
        resource: String,
        requested: u64,
        available: u64,
    },
    HostNotFound,
}
