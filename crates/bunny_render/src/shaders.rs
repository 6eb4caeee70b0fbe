/// Lit, instanced box shader: ambient term plus one spot light with
/// distance decay.
pub const MESH_SHADER: &str = r#"
struct Frame {
    view_proj: mat4x4<f32>,
    ambient: vec4<f32>,
    light_position: vec4<f32>,
    light_direction: vec4<f32>,
    light_color: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> frame: Frame;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) color: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world_pos = model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = frame.view_proj * world_pos;
    out.world_position = world_pos.xyz;
    out.world_normal = normalize((model * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.color = instance.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.world_normal);
    let to_light = frame.light_position.xyz - in.world_position;
    let dist = max(length(to_light), 1.0);
    let l = normalize(to_light);

    let cos_outer = frame.light_position.w;
    let cos_angle = dot(-l, normalize(frame.light_direction.xyz));
    let cone = smoothstep(cos_outer, cos_outer + 0.05, cos_angle);
    let decay = pow(dist, frame.light_direction.w);

    let diffuse = max(dot(n, l), 0.0) * cone / decay;
    let lit = frame.ambient.rgb + frame.light_color.rgb * diffuse;
    return vec4<f32>(in.color.rgb * lit, in.color.a);
}
"#;
