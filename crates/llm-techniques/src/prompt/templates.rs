//! Prompt templates, rendered with minijinja.
//!
//! Every interpolated value is sanitised by the builder before rendering.

pub const ZERO_SHOT: &str = r#"{{ instruction }}

Text:
"{{ input }}"

{% if labels %}Return EXACTLY one of the following labels (case sensitive as written): {{ labels | join(", ") }}.{% else %}Return ONLY the final answer.{% endif %}
IMPORTANT: Output must be ONLY the single label (no explanation, no bullets, no extra text, no code block).
If you cannot determine a label, output "Unknown".
"#;

pub const FEW_SHOT: &str = r#"{{ instruction }}

{% for example in examples -%}
Text: "{{ example.text }}"
{% if example.label -%}
Answer: {{ example.label }}
{% elif example.summary -%}
Summary:
{{ example.summary }}
{% else -%}
Output:

{% endif -%}
--
{% endfor %}
Now apply the same format to this input:

Text:
"{{ input }}"
{% if labels %}
Answer with one of: {{ labels | join(", ") }}.
{% endif %}
IMPORTANT: Output must be ONLY the final answer (no explanations, no bullet points, no extra text). If unsure, return "Unknown".
"#;

pub const CHAIN_OF_THOUGHT: &str = r#"{{ instruction }}

Problem:
"{{ input }}"

Work through the problem step by step, then respond in exactly this format:

REASONING:
1. <first step>
2. <next step>
...

FINAL_ANSWER: <the concise final answer only>
"#;

pub const SELF_CONSISTENCY: &str = r#"{{ instruction }}

Problem:
"{{ input }}"

Solve the problem along at least 5 independent reasoning paths. Each path must reason from scratch and reach its own answer. Then choose the answer that most paths agree on.

Respond in exactly this format:

Reasoning Paths:
1. <first path and its answer>
2. <second path and its answer>
3. <third path and its answer>
4. <fourth path and its answer>
5. <fifth path and its answer>

Final Answer: <the majority answer only>
"#;

pub const PROGRAM_AIDED: &str = r#"{{ instruction }}

Problem:
"{{ input }}"

Write the program in the Rhai scripting language:
- Define a zero-argument function with `fn solution() { ... }`.
- Bind variables with `let`. Use floating-point literals such as `2.0` when division must not truncate.
- The function must return the final answer. Do not print anything and do not read input.

Respond in exactly this format:

PROGRAM_CODE:
```rhai
fn solution() {
    // compute the answer
}
```
"#;

pub const DIRECTIONAL_GENERATOR: &str = r#"You are preparing hints for another solver.

Problem:
"{{ input }}"

Do NOT solve the problem. Instead, list short directional stimuli: keywords, relevant facts, and hints that point toward the right approach.

Respond in exactly this format:

Directional Stimuli:
- <hint>
- <hint>
- <hint>
"#;

pub const DIRECTIONAL_SOLVER: &str = r#"Solve the problem below. Use the directional stimuli as guidance.

Problem:
"{{ input }}"

Directional Stimuli:
{{ stimuli }}

Respond in exactly this format:

Answer: <the final answer>
Justification: <a brief explanation that refers to the stimuli you used>
"#;

pub const REACT: &str = r#"Answer the question by interleaving Thought, Action, and Observation steps.

Available tools: {{ tool_spec }}
When you know the final answer, use `finish` as the Action and give the answer as its Action Input.

Use exactly this format for every step, and produce only one step at a time:
Thought: <your reasoning about what to do next>
Action: <one tool name, or finish>
Action Input: <the input for the tool>

The Observation will be provided to you after each Action.

Question: {{ input }}

Thought:"#;

pub const REFLEXION: &str = r#"Solve the problem below, then critique and improve your own solution.

Problem:
"{{ input }}"

Perform at most {{ max_reflections }} reflection cycles. In each cycle, reflect on the weaknesses or errors of the latest solution, then write a revised solution. Stop early once the solution is correct.

Respond in exactly this format:

INITIAL_ATTEMPT:
<your first solution>

REFLECTION_1:
<critique of the initial attempt>

REVISED_SOLUTION_1:
<improved solution>

(continue with REFLECTION_2 / REVISED_SOLUTION_2 and so on as needed)

FINAL_ANSWER:
<the final answer only>
"#;

pub const RETRIEVAL_AUGMENTED: &str = r#"You are answering a question using the retrieved documents below. Ground every claim in the documents where possible.
Reasoning style: {{ reasoning_style }}.

RETRIEVED DOCUMENTS:
{% for doc in documents -%}
[Document {{ loop.index }}] Source: {{ doc.source }} (relevance: {{ doc.relevanceScore }})
{{ doc.content }}

{% endfor -%}
QUESTION: {{ input }}

Respond in exactly this format:

DOCUMENT ANALYSIS:
<what each relevant document contributes>

REASONING:
<how the information answers the question>

ANSWER:
<a complete answer>

Final Answer: <a one or two sentence answer>
"#;

pub const ATTACHED_FILES_NOTE: &str = r#"

Additionally, analyze the following uploaded files that may be relevant to the query:
Files included: {{ files | join(", ") }}
Please incorporate insights from these files into your response.
"#;
