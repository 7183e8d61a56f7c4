pub use self::{
    graphql::{GraphQLError, GraphQLRequest, GraphQLResponse, User, UsersData},
    tvl_chart_response::{TvlChartResponse, TvlPoint},
};

mod graphql;
mod tvl_chart_response;
