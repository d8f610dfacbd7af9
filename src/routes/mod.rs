/// Router Module Index
///
/// Routes are grouped by the access they require. Guards are attached as
/// `route_layer`s in `create_router`, so a handler never has to check access
/// itself.

/// Reachable without a token: health, register, login.
pub mod public;

/// Read access for any valid session.
pub mod authenticated;

/// Writes, restricted to the `admin` role.
pub mod admin;
