pub mod osrm;

pub use osrm::{
    label_waypoints, OsrmClient, RouteError, RouteResult, RouteSummary, Waypoint,
    NO_ROUTE_MESSAGE,
};
